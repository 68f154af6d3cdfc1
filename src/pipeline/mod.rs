//! Pipeline stages for both conversion directions.
//!
//! Each submodule does one transformation step and is tested on its own.
//! The engines (`render` for reading PDFs, `author` for writing them) sit
//! behind traits so they can be swapped without touching the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! PDF → JPEG:   input ──▶ render ──▶ encode
//!               (bytes)   (pdfium)   (JPEG q95)
//!
//! JPEG/PNG → PDF:  input ──▶ decode ──▶ author
//!                  (bytes)   (image)    (lopdf)
//! ```
//!
//! 1. [`input`]  — read files, check signatures, carry image names
//! 2. [`render`] — rasterise one page at an exact pixel size; blocking
//! 3. [`encode`] — flatten to RGB and JPEG-encode
//! 4. [`decode`] — decode source images, decide how each is embedded
//! 5. [`author`] — place images on pages and serialise the PDF

pub mod author;
pub mod decode;
pub mod encode;
pub mod input;
pub mod render;
