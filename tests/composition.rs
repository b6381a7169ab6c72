mod common;

use certify_batch::{Error, GlyphImage, Template, compose};
use common::{cm_operands, first_page, glyph, page_image_names};
use lopdf::{Document, Object};

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn template_reports_first_page_size() {
    let template = Template::from_bytes(common::a4_landscape_template()).unwrap();
    assert_eq!(template.first_page_size().unwrap(), (842.0, 595.0));
}

#[test]
fn rejects_bytes_that_are_not_a_pdf() {
    let result = Template::from_bytes(b"certificate.docx, not a PDF".to_vec());
    assert!(result.is_err());
}

#[test]
fn name_is_centered_horizontally_and_on_the_baseline() {
    let template = Template::from_bytes(common::a4_landscape_template()).unwrap();
    let pdf = compose(&template, &glyph(200.0, 90.0), 285.0).unwrap();

    let doc = Document::load_mem(&pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    let page = first_page(&doc);

    let transforms = cm_operands(&doc, page);
    assert_eq!(transforms.len(), 1, "{transforms:?}");
    let cm = &transforms[0];
    assert_close(cm[0], 200.0);
    assert_close(cm[3], 90.0);
    assert_close(cm[4], (842.0 - 200.0) / 2.0);
    assert_close(cm[5], 285.0 - 45.0);
}

#[test]
fn template_drawing_is_kept_and_name_drawn_last() {
    let template = Template::from_bytes(common::a4_landscape_template()).unwrap();
    let pdf = compose(&template, &glyph(120.0, 60.0), 300.0).unwrap();

    let doc = Document::load_mem(&pdf).unwrap();
    let page = first_page(&doc);
    let content = doc.get_page_content(page).unwrap();
    let text = String::from_utf8_lossy(&content);

    let heading = text.find("THIS CERTIFICATE IS AWARDED TO").unwrap();
    let stamp = text.find("/CertName1 Do").unwrap();
    assert!(heading < stamp);

    // Original font resource survives next to the new image.
    let page_dict = doc.get_dictionary(page).unwrap();
    let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();
    assert!(resources.get(b"Font").is_ok());
    assert_eq!(page_image_names(&doc, page), ["CertName1"]);
}

#[test]
fn embedded_image_keeps_pixel_size_and_alpha() {
    let template = Template::from_bytes(common::a4_landscape_template()).unwrap();
    let pdf = compose(&template, &glyph(150.0, 45.0), 285.0).unwrap();

    let doc = Document::load_mem(&pdf).unwrap();
    let page = first_page(&doc);
    let page_dict = doc.get_dictionary(page).unwrap();
    let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let image_id = xobjects.get(b"CertName1").unwrap().as_reference().unwrap();
    let image = doc.get_object(image_id).unwrap().as_stream().unwrap();

    assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 300);
    assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 90);
    let mask_id = image.dict.get(b"SMask").unwrap().as_reference().unwrap();
    let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();

    for stream in [image, mask] {
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode"
        );
        assert!(stream.decompressed_content().is_ok());
    }
    assert_eq!(image.decompressed_content().unwrap().len(), 300 * 90 * 3);
    assert_eq!(mask.decompressed_content().unwrap().len(), 300 * 90);
}

#[test]
fn each_composition_starts_from_a_clean_template() {
    let template = Template::from_bytes(common::a4_landscape_template()).unwrap();

    let first = compose(&template, &glyph(100.0, 40.0), 285.0).unwrap();
    let second = compose(&template, &glyph(300.0, 40.0), 285.0).unwrap();

    for pdf in [first, second] {
        let doc = Document::load_mem(&pdf).unwrap();
        let page = first_page(&doc);
        assert_eq!(page_image_names(&doc, page), ["CertName1"]);
        assert_eq!(cm_operands(&doc, page).len(), 1);
    }
}

#[test]
fn fresh_parses_do_not_share_state() {
    let template = Template::from_bytes(common::a4_landscape_template()).unwrap();

    let mut scratch = template.parse_fresh().unwrap();
    let page = first_page(&scratch);
    let untouched = template.parse_fresh().unwrap();
    let object_count = untouched.objects.len();

    scratch
        .get_dictionary_mut(page)
        .unwrap()
        .set("Contents", Object::Array(Vec::new()));
    scratch.add_object(Object::Integer(42));

    let again = template.parse_fresh().unwrap();
    assert_eq!(again.objects.len(), object_count);
    assert!(
        again
            .get_dictionary(first_page(&again))
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_reference()
            .is_ok()
    );
}

#[test]
fn inherited_media_box_and_resources_are_honoured() {
    let template = Template::from_bytes(common::inherited_two_page_template()).unwrap();
    assert_eq!(template.first_page_size().unwrap(), (595.0, 842.0));

    let pdf = compose(&template, &glyph(200.0, 60.0), 400.0).unwrap();
    let doc = Document::load_mem(&pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 2);

    let pages: Vec<_> = doc.get_pages().values().copied().collect();
    let cm = &cm_operands(&doc, pages[0])[0];
    assert_close(cm[4], (595.0 - 200.0) / 2.0);
    assert_close(cm[5], 370.0);

    // Page 1 gets its own copy of the inherited fonts plus the image.
    let page_one = doc.get_dictionary(pages[0]).unwrap();
    let resources = page_one.get(b"Resources").unwrap().as_dict().unwrap();
    assert!(resources.get(b"Font").is_ok());
    assert_eq!(page_image_names(&doc, pages[0]), ["CertName1"]);

    // Page 2 still inherits and is not stamped.
    let page_two = doc.get_dictionary(pages[1]).unwrap();
    assert!(page_two.get(b"Resources").is_err());
    assert!(cm_operands(&doc, pages[1]).is_empty());
}

#[test]
fn undecodable_name_image_fails_only_this_certificate() {
    let template = Template::from_bytes(common::a4_landscape_template()).unwrap();
    let broken = GlyphImage {
        png: b"not a png".to_vec(),
        width: 10.0,
        height: 10.0,
    };
    let err = compose(&template, &broken, 285.0).unwrap_err();
    assert!(matches!(err, Error::Composition(_)), "{err}");
    assert!(!err.is_batch_fatal());
}
