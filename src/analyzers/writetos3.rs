use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::io::Write;
use tracing::debug;

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
///
/// With `gzip` set the body is compressed and tagged `Content-Encoding: gzip`,
/// so browsers fetching the object decompress it transparently.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
    gzip: bool,
) -> anyhow::Result<()> {
    let json = serde_json::to_vec(value)?;

    let mut request = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type("application/json");

    let body = if gzip {
        request = request.content_encoding("gzip");
        gzip_bytes(&json)?
    } else {
        json
    };

    debug!(bucket, key, bytes = body.len(), gzip, "Uploading JSON object");
    request.body(body.into()).send().await?;

    Ok(())
}

pub fn gzip_bytes(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_bytes_decompresses_to_input() {
        let input = br#"{"from":"USA","children":[]}"#;
        let compressed = gzip_bytes(input).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, input);
    }
}
