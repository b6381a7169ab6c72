//! Inspect a generated certificate archive.
//!
//! Usage:
//!   archive-inspect <certificates.zip>                 list entries with page count and name placement
//!   archive-inspect <certificates.zip> <entry.pdf>     write one certificate to stdout

use std::fs;
use std::io::{self, Read, Write};

use lopdf::content::Content;
use lopdf::{Document, Object};
use zip::ZipArchive;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage:");
        eprintln!("  archive-inspect <certificates.zip>               list certificates");
        eprintln!("  archive-inspect <certificates.zip> <entry.pdf>   dump one certificate");
        std::process::exit(1);
    }

    let file = fs::File::open(&args[1]).unwrap_or_else(|e| {
        eprintln!("Cannot open '{}': {e}", args[1]);
        std::process::exit(1);
    });
    let mut archive = ZipArchive::new(file).unwrap_or_else(|e| {
        eprintln!("Not a valid ZIP: {e}");
        std::process::exit(1);
    });

    match args.get(2) {
        None => list_entries(&mut archive),
        Some(path) => dump_entry(&mut archive, path),
    }
}

fn list_entries(archive: &mut ZipArchive<fs::File>) {
    println!("{:>9}  {:>5}  {:<28}  path", "bytes", "pages", "name image (x, y, w, h)");
    println!("{}", "-".repeat(72));
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let name = entry.name().to_string();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();

        match Document::load_mem(&content) {
            Ok(doc) => {
                let placement = stamp_placement(&doc)
                    .map(|[w, h, x, y]| format!("({x:.1}, {y:.1}, {w:.1}, {h:.1})"))
                    .unwrap_or_else(|| "none".into());
                println!(
                    "{:>9}  {:>5}  {:<28}  {name}",
                    content.len(),
                    doc.get_pages().len(),
                    placement
                );
            }
            Err(e) => println!("{:>9}  {:>5}  {:<28}  {name} (unreadable: {e})", content.len(), "?", "-"),
        }
    }
    println!("{} entries", archive.len());
}

/// Size and position of the last image drawn on page 1, from its `cm` operator.
fn stamp_placement(doc: &Document) -> Option<[f32; 4]> {
    let page_id = *doc.get_pages().values().next()?;
    let content = Content::decode(&doc.get_page_content(page_id).ok()?).ok()?;

    let mut last_cm = None;
    let mut placement = None;
    for op in &content.operations {
        match op.operator.as_str() {
            "cm" => {
                let values: Vec<f32> = op.operands.iter().filter_map(|o| o.as_float().ok()).collect();
                if let [a, _, _, d, e, f] = values[..] {
                    last_cm = Some([a, d, e, f]);
                }
            }
            "Do" if matches!(op.operands.first(), Some(Object::Name(_))) => placement = last_cm,
            _ => {}
        }
    }
    placement
}

fn dump_entry(archive: &mut ZipArchive<fs::File>, path: &str) {
    let mut entry = archive.by_name(path).unwrap_or_else(|_| {
        eprintln!("'{}' not found in archive", path);
        eprintln!("Run without an entry argument to list available certificates.");
        std::process::exit(1);
    });

    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    io::stdout().write_all(&content).unwrap();
}
