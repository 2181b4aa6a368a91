#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use backend::report::{InlineImage, NarrativeGenerator, ReportError};
use backend::vision::model::{Classifier, InferenceError};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array4;

pub const BOUNDARY: &str = "----scan-test-boundary";

pub struct FormPart<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub bytes: &'a [u8],
}

impl<'a> FormPart<'a> {
    pub fn file(filename: &'a str, bytes: &'a [u8]) -> Self {
        Self { name: "file", filename: Some(filename), bytes }
    }
}

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A file part whose body ends before the closing boundary.
pub fn truncated_multipart_body(filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        BOUNDARY, filename
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body
}

pub fn png_bytes(seed: u8) -> Vec<u8> {
    let image = RgbImage::from_fn(64, 48, |x, y| {
        Rgb([(x as u8).wrapping_mul(3).wrapping_add(seed), (y as u8).wrapping_mul(5), seed])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Scores derived from the input so identical uploads give identical output.
pub struct MeanClassifier {
    pub classes: usize,
}

impl Classifier for MeanClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let mean = input.mean().unwrap_or(0.0);
        Ok((0..self.classes)
            .map(|i| 1.0 / (1.0 + (-(mean + i as f32 * 0.37).sin() * 4.0).exp()))
            .collect())
    }
}

pub struct FixedClassifier(pub Vec<f32>);

impl Classifier for FixedClassifier {
    fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        Ok(self.0.clone())
    }
}

pub struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        Err(InferenceError::Poisoned)
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub calls: Mutex<Vec<(String, Option<InlineImage>)>>,
}

#[async_trait]
impl NarrativeGenerator for RecordingReporter {
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, ReportError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), image.cloned()));
        Ok("# Summary\nNo acute findings.".to_string())
    }
}

pub struct FailingReporter;

#[async_trait]
impl NarrativeGenerator for FailingReporter {
    async fn generate(&self, _prompt: &str, _image: Option<&InlineImage>) -> Result<String, ReportError> {
        Err(ReportError::Api {
            status: 503,
            body: "model overloaded".to_string(),
        })
    }
}
