//! PDF authoring: decoded images → a serialised multi-page PDF.
//!
//! The composer only needs four operations from an authoring backend, so
//! they sit behind [`DocumentAuthor`]. [`LopdfAuthor`] builds the object
//! graph with `lopdf`: one image XObject per placed image, one content
//! stream per page, a single `Pages` node and the catalog.
//!
//! Placement rectangles arrive in top-left coordinates (see
//! [`crate::geometry`]); PDF user space grows upwards from the bottom-left,
//! so `y` is flipped when the image matrix is written.

use crate::error::PdfImgError;
use crate::geometry::{PageSize, Rect};
use crate::pipeline::decode::{DecodedImage, ImagePayload, JpegColor};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// A page-oriented PDF writer.
pub trait DocumentAuthor {
    /// Start a new, empty page of the configured size.
    fn add_page(&mut self);

    /// Draw `image` on the current page, stretched into `rect`.
    fn place_image(&mut self, image: &DecodedImage, rect: Rect) -> Result<(), PdfImgError>;

    fn page_count(&self) -> usize;

    /// Serialise the document.
    fn finish(self) -> Result<Vec<u8>, PdfImgError>
    where
        Self: Sized;
}

#[derive(Default)]
struct PendingPage {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// `lopdf`-backed author. Starts with one blank page, like a fresh document.
pub struct LopdfAuthor {
    doc: Document,
    pages_id: ObjectId,
    page_size: PageSize,
    pages: Vec<PendingPage>,
    image_count: usize,
}

impl LopdfAuthor {
    pub fn new(page_size: PageSize) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_size,
            pages: vec![PendingPage::default()],
            image_count: 0,
        }
    }

    fn add_image_object(&mut self, image: &DecodedImage) -> ObjectId {
        let width = i64::from(image.width);
        let height = i64::from(image.height);

        match &image.payload {
            ImagePayload::Jpeg { data, color } => {
                let color_space = match color {
                    JpegColor::Gray => "DeviceGray",
                    JpegColor::Rgb => "DeviceRGB",
                };
                let dict = dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                };
                self.doc
                    .add_object(Stream::new(dict, data.clone()).with_compression(false))
            }
            ImagePayload::Rgb { samples, alpha } => {
                let mut dict = dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                };
                if let Some(alpha) = alpha {
                    let mask = dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width,
                        "Height" => height,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    };
                    let mask_id = self.doc.add_object(Stream::new(mask, alpha.clone()));
                    dict.set("SMask", Object::Reference(mask_id));
                }
                self.doc.add_object(Stream::new(dict, samples.clone()))
            }
        }
    }
}

impl DocumentAuthor for LopdfAuthor {
    fn add_page(&mut self) {
        self.pages.push(PendingPage::default());
    }

    fn place_image(&mut self, image: &DecodedImage, rect: Rect) -> Result<(), PdfImgError> {
        let image_id = self.add_image_object(image);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let page_height = self.page_size.height;
        let page = self
            .pages
            .last_mut()
            .ok_or_else(|| PdfImgError::PdfAssembly("no page to draw on".into()))?;

        page.xobjects.set(name.as_bytes(), Object::Reference(image_id));

        let pdf_y = page_height - rect.y - rect.height;
        page.operations.push(Operation::new("q", vec![]));
        page.operations.push(Operation::new(
            "cm",
            vec![
                Object::Real(rect.width),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(rect.height),
                Object::Real(rect.x),
                Object::Real(pdf_y),
            ],
        ));
        page.operations
            .push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        page.operations.push(Operation::new("Q", vec![]));

        debug!(
            "Placed {}x{} px image at ({:.1}, {:.1}) size {:.1}x{:.1} pt",
            image.width, image.height, rect.x, rect.y, rect.width, rect.height
        );
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn finish(mut self) -> Result<Vec<u8>, PdfImgError> {
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.page_size.width),
            Object::Real(self.page_size.height),
        ];

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in std::mem::take(&mut self.pages) {
            let content = Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|e| PdfImgError::PdfAssembly(e.to_string()))?;
            let content_id = self
                .doc
                .add_object(Stream::new(dictionary! {}, content).with_compression(false));

            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => page.xobjects,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| PdfImgError::PdfAssembly(e.to_string()))?;

        debug!("Serialised PDF: {} pages, {} bytes", count, buf.len());
        Ok(buf)
    }
}
