use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Presigned photo links handed out with log listings.
pub const PHOTO_URL_TTL_SECS: u64 = 10 * 60;

/// Guesses the image type from magic bytes; falls back to JPEG.
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [_, _, _, _, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c', ..] => "image/heic",
        _ => "image/jpeg",
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Accepts raw base64 or a `data:image/...;base64,` URI.
pub fn decode_base64_image(input: &str) -> Result<Bytes, AppError> {
    let trimmed = input.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    if payload.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    let bytes = BASE64
        .decode(payload)
        .map_err(|_| AppError::validation("image is not valid base64"))?;
    if bytes.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    Ok(Bytes::from(bytes))
}

pub fn photo_key(user_id: Uuid, log_id: Uuid, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("food-logs/{user_id}/{log_id}.{ext}")
}

/// Stores the photo for a log entry and returns its object key.
pub async fn upload_food_photo(
    st: &AppState,
    user_id: Uuid,
    log_id: Uuid,
    body: Bytes,
) -> anyhow::Result<String> {
    let content_type = sniff_image_mime(&body);
    let key = photo_key(user_id, log_id, content_type);
    st.storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {key}"))?;
    Ok(key)
}

pub async fn presign_many(
    st: &AppState,
    keys: Vec<String>,
    expires_seconds: u64,
) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::with_capacity(keys.len());
    for k in keys {
        out.push(st.storage.presign_get(&k, expires_seconds).await?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0";

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_image_mime(PNG_HEADER), "image/png");
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), "image/jpeg");
        assert_eq!(sniff_image_mime(b"RIFF\x10\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_image_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_image_mime(b"??"), "image/jpeg");
    }

    #[test]
    fn ext_from_mime_known_and_unknown() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn decodes_plain_and_data_uri() {
        let plain = BASE64.encode(PNG_HEADER);
        assert_eq!(decode_base64_image(&plain).unwrap().as_ref(), PNG_HEADER);

        let uri = format!("data:image/png;base64,{plain}");
        assert_eq!(decode_base64_image(&uri).unwrap().as_ref(), PNG_HEADER);
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(matches!(
            decode_base64_image("not base64 at all!"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(decode_base64_image("  "), Err(AppError::Validation(_))));
        assert!(matches!(
            decode_base64_image("data:image/png;base64,"),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn upload_uses_log_scoped_key() {
        let (state, storage) = AppState::fake_with_storage(Default::default());
        let user = Uuid::new_v4();
        let log = Uuid::new_v4();

        let key = upload_food_photo(&state, user, log, Bytes::from_static(PNG_HEADER))
            .await
            .unwrap();
        assert_eq!(key, format!("food-logs/{user}/{log}.png"));
        assert_eq!(storage.keys(), vec![key.clone()]);

        let urls = presign_many(&state, vec![key.clone()], PHOTO_URL_TTL_SECS)
            .await
            .unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains(&key));
        assert!(urls[0].ends_with("expires=600"));
    }
}
