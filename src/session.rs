use crate::batch::{GeneratedArchive, generate_batch};
use crate::compose::Template;
use crate::error::Error;
use crate::layout::{LayoutSuggester, PreviewImage, resolve};
use crate::model::{GenerationProgress, LayoutConfig, Participant};
use crate::raster::TextRasterizer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    UploadTemplate,
    AiAnalysis,
    UploadList,
    Generation,
    Complete,
}

/// One certificate run: the template and layout, the participant list,
/// and what happened last. Owned by the caller and passed explicitly.
pub struct Session {
    step: Step,
    template: Option<Template>,
    layout: Option<LayoutConfig>,
    participants: Vec<Participant>,
    progress: GenerationProgress,
    error: Option<String>,
    archive: Option<GeneratedArchive>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            step: Step::UploadTemplate,
            template: None,
            layout: None,
            participants: Vec::new(),
            progress: GenerationProgress::default(),
            error: None,
            archive: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn layout(&self) -> Option<&LayoutConfig> {
        self.layout.as_ref()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn progress(&self) -> &GenerationProgress {
        &self.progress
    }

    /// Message describing the last failure, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn archive(&self) -> Option<&GeneratedArchive> {
        self.archive.as_ref()
    }

    fn fail(&mut self, e: Error) -> Error {
        self.error = Some(e.to_string());
        e
    }

    /// Accept a template and resolve its layout. The layout step never
    /// fails: without a usable suggestion the default layout is used.
    /// When a suggester is given without a preview, page 1 is rendered.
    pub fn load_template(
        &mut self,
        bytes: Vec<u8>,
        suggester: Option<&dyn LayoutSuggester>,
        preview: Option<&PreviewImage>,
    ) -> Result<&LayoutConfig, Error> {
        let template = Template::from_bytes(bytes).map_err(|e| self.fail(e))?;
        self.archive = None;
        self.error = None;

        self.step = Step::AiAnalysis;
        let rendered = match (suggester, preview) {
            (Some(_), None) => PreviewImage::from_template(&template)
                .inspect_err(|e| log::warn!("{e}"))
                .ok(),
            _ => None,
        };
        let layout = resolve(suggester, preview.or(rendered.as_ref()));
        self.template = Some(template);
        self.step = Step::UploadList;
        Ok(self.layout.insert(layout))
    }

    /// Change the layout before generation starts. Rejected changes leave
    /// the previous layout in place.
    pub fn adjust_layout(&mut self, adjust: impl FnOnce(&mut LayoutConfig)) -> Result<(), Error> {
        if self.step == Step::Generation {
            return Err(Error::InvalidLayout("generation is in progress".into()));
        }
        let Some(current) = self.layout.as_ref() else {
            return Err(self.fail(Error::MissingTemplate));
        };
        let mut adjusted = current.clone();
        adjust(&mut adjusted);
        adjusted.validate().map_err(|e| self.fail(e))?;
        self.layout = Some(adjusted);
        Ok(())
    }

    pub fn set_participants(&mut self, participants: Vec<Participant>) -> Result<(), Error> {
        if participants.is_empty() {
            return Err(self.fail(Error::EmptyParticipantList));
        }
        self.participants = participants;
        self.error = None;
        Ok(())
    }

    /// Run the batch. On a fatal failure the session returns to
    /// [`Step::UploadList`] with the template and layout kept, so the list
    /// can be replaced and generation retried.
    pub fn generate<R, F>(&mut self, rasterizer: &R, mut on_progress: F) -> Result<&GeneratedArchive, Error>
    where
        R: TextRasterizer + ?Sized,
        F: FnMut(&GenerationProgress),
    {
        let (Some(template), Some(layout)) = (self.template.as_ref(), self.layout.as_ref()) else {
            return Err(self.fail(Error::MissingTemplate));
        };
        if self.participants.is_empty() {
            return Err(self.fail(Error::EmptyParticipantList));
        }

        self.step = Step::Generation;
        self.archive = None;
        self.progress = GenerationProgress::start(self.participants.len());
        let progress = &mut self.progress;
        let result = generate_batch(template, &self.participants, layout, rasterizer, |current| {
            progress.advance(current);
            on_progress(progress);
        });

        match result {
            Ok(archive) => {
                self.step = Step::Complete;
                self.error = None;
                Ok(self.archive.insert(archive))
            }
            Err(e) => {
                self.step = Step::UploadList;
                self.progress = GenerationProgress::default();
                Err(self.fail(e))
            }
        }
    }

    /// Forget everything and start over from the template step.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
