//! HTTP scene-segmentation client.
//!
//! POSTs an image as multipart field `data` and reads back
//! `{"object": {"classes": [..], "ratios": ["12.5%", ..]}}`. Blocking,
//! one request per image, no retry: a failed image is reported to the
//! caller as a [`SegmentationError`] and counted, never fatal.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use serde_json::Value;
use streetscape_engine::{Segmentation, SegmentationError, Segmenter};

use crate::error::IoError;

pub const USER_AGENT: &str = concat!("streetscape/", env!("CARGO_PKG_VERSION"));

pub struct HttpSegmenter {
    http: reqwest::blocking::Client,
    endpoint: String,
    images_dir: PathBuf,
    extension: String,
}

impl HttpSegmenter {
    pub fn new(
        endpoint: impl Into<String>,
        images_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IoError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IoError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            images_dir: images_dir.into(),
            extension: extension.into(),
        })
    }

    pub fn image_path(&self, image_name: &str) -> PathBuf {
        self.images_dir.join(format!("{image_name}.{}", self.extension))
    }
}

impl Segmenter for HttpSegmenter {
    fn segment(&self, image_name: &str) -> Result<Segmentation, SegmentationError> {
        let path = self.image_path(image_name);
        let bytes = std::fs::read(&path).map_err(|e| SegmentationError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_name.to_string());

        let form = Form::new().part("data", Part::bytes(bytes).file_name(file_name));
        let resp = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| SegmentationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SegmentationError::Status(status.as_u16()));
        }
        let text = resp
            .text()
            .map_err(|e| SegmentationError::Transport(e.to_string()))?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| SegmentationError::Parse(e.to_string()))?;
        let seg = parse_segmentation(&body)?;
        log::debug!("segmented '{image_name}': {} class(es)", seg.len());
        Ok(seg)
    }
}

/// `"12.5%"` → `0.125`.
pub fn parse_ratio(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let number = s.strip_suffix('%').unwrap_or(s).trim();
    number.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v / 100.0)
}

fn list<'a>(object: &'a Value, key: &str) -> Result<&'a Vec<Value>, SegmentationError> {
    object
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| SegmentationError::Parse(format!("'object.{key}' is not a list")))
}

pub fn parse_segmentation(body: &Value) -> Result<Segmentation, SegmentationError> {
    let object = body
        .get("object")
        .ok_or_else(|| SegmentationError::Parse("response has no 'object'".into()))?;
    let classes = list(object, "classes")?;
    let ratios = list(object, "ratios")?;
    if classes.len() != ratios.len() {
        return Err(SegmentationError::Parse(format!(
            "{} class(es) but {} ratio(s)",
            classes.len(),
            ratios.len()
        )));
    }

    classes
        .iter()
        .zip(ratios)
        .map(|(class, ratio)| {
            let class = class
                .as_str()
                .ok_or_else(|| SegmentationError::Parse(format!("class {class} is not a string")))?;
            let fraction = match ratio {
                Value::String(s) => parse_ratio(s),
                Value::Number(n) => n.as_f64().map(|v| v / 100.0),
                _ => None,
            }
            .ok_or_else(|| SegmentationError::Parse(format!("bad ratio {ratio} for '{class}'")))?;
            Ok((class.to_string(), fraction))
        })
        .collect()
}
