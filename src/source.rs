//! Where input resources live.
//!
//! The trade CSV and the category dictionary can each come from a local path,
//! an `http(s)://` URL or an `s3://bucket/key` object. Everything is loaded
//! before aggregation starts, and any failure here is reported as
//! [`TradeDataError::Unavailable`].

use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Result, TradeDataError};
use crate::fetch::{HttpClient, fetch_bytes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Http(String),
    S3 { bucket: String, key: String },
}

impl FromStr for Source {
    type Err = TradeDataError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TradeDataError::unavailable(s, "empty source"));
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(Source::Http(s.to_string()));
        }

        if let Some(rest) = s.strip_prefix("s3://") {
            return match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Source::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(TradeDataError::unavailable(s, "expected s3://bucket/key")),
            };
        }

        Ok(Source::File(PathBuf::from(s)))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Http(url) => f.write_str(url),
            Source::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

impl Source {
    /// Reads the whole resource into memory.
    pub async fn load<C: HttpClient + ?Sized>(
        &self,
        http: &C,
        s3: Option<&aws_sdk_s3::Client>,
    ) -> Result<Bytes> {
        let bytes = match self {
            Source::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| TradeDataError::unavailable(self.to_string(), e))?,
            Source::Http(url) => fetch_bytes(http, url)
                .await
                .map_err(|e| TradeDataError::unavailable(self.to_string(), e))?,
            Source::S3 { bucket, key } => {
                let s3 = s3.ok_or_else(|| {
                    TradeDataError::unavailable(self.to_string(), "no S3 client configured")
                })?;
                let object = s3
                    .get_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| TradeDataError::unavailable(self.to_string(), e))?;
                object
                    .body
                    .collect()
                    .await
                    .map_err(|e| TradeDataError::unavailable(self.to_string(), e))?
                    .into_bytes()
            }
        };

        debug!(source = %self, bytes = bytes.len(), "Source loaded");
        Ok(bytes)
    }

    /// Reads the resource as UTF-8 text. Used for the JSON dictionary; the
    /// trade CSV goes through [`Source::load`] so bad rows are skipped singly.
    pub async fn load_text<C: HttpClient + ?Sized>(
        &self,
        http: &C,
        s3: Option<&aws_sdk_s3::Client>,
    ) -> Result<String> {
        let bytes = self.load(http, s3).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| TradeDataError::unavailable(self.to_string(), e))
    }

    pub fn is_s3(&self) -> bool {
        matches!(self, Source::S3 { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use std::io::Write;

    #[test]
    fn test_parse_sources() {
        assert_eq!(
            "data/expanded_summary.csv".parse::<Source>().unwrap(),
            Source::File(PathBuf::from("data/expanded_summary.csv"))
        );
        assert_eq!(
            "https://example.com/expanded_summary.csv".parse::<Source>().unwrap(),
            Source::Http("https://example.com/expanded_summary.csv".into())
        );
        assert_eq!(
            "s3://tarrific-data/raw/expanded_summary.csv".parse::<Source>().unwrap(),
            Source::S3 {
                bucket: "tarrific-data".into(),
                key: "raw/expanded_summary.csv".into(),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_s3_uri() {
        assert!("s3://bucket-only".parse::<Source>().is_err());
        assert!("s3:///key".parse::<Source>().is_err());
        assert!("  ".parse::<Source>().is_err());
    }

    #[test]
    fn test_display_round_trips_s3() {
        let source: Source = "s3://b/k.csv".parse().unwrap();
        assert_eq!(source.to_string(), "s3://b/k.csv");
        assert!(source.is_s3());
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "partner_iso,hs4\n").unwrap();

        let source = Source::File(file.path().to_path_buf());
        let text = source.load_text(&BasicClient::new().unwrap(), None).await.unwrap();
        assert_eq!(text, "partner_iso,hs4\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let source = Source::File(PathBuf::from("/nonexistent/expanded_summary.csv"));
        let result = source.load(&BasicClient::new().unwrap(), None).await;
        assert!(matches!(result, Err(TradeDataError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_s3_without_client_is_unavailable() {
        let source: Source = "s3://b/k.csv".parse().unwrap();
        let result = source.load(&BasicClient::new().unwrap(), None).await;
        assert!(matches!(result, Err(TradeDataError::Unavailable { .. })));
    }
}
