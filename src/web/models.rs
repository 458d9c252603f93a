// Wire formats of the hosted endpoints

use serde::{Deserialize, Serialize, Serializer};

/// Body of `POST /enhance` and of a function invocation.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub image_url: Option<String>,
    pub scale: Option<u32>,
}

/// `{ "status": true, "enhancedImage": ... }` or `{ "status": false, "message": ... }`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EnhanceResponse {
    pub const FAILURE_MESSAGE: &'static str = "Image enhancement failed";

    pub fn success(enhanced_image: String) -> Self {
        Self {
            status: true,
            enhanced_image: Some(enhanced_image),
            message: None,
        }
    }

    pub fn failure() -> Self {
        Self {
            status: false,
            enhanced_image: None,
            message: Some(Self::FAILURE_MESSAGE.to_string()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ObjectRef {
    pub bucket: Option<String>,
    pub key: Option<String>,
}

impl ObjectRef {
    /// Bucket and key, if both are present and non-empty.
    pub fn location(&self) -> Option<(&str, &str)> {
        match (self.bucket.as_deref(), self.key.as_deref()) {
            (Some(bucket), Some(key)) if !bucket.is_empty() && !key.is_empty() => {
                Some((bucket, key))
            }
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct OutputLocation {
    pub bucket: Option<String>,
    #[serde(default)]
    pub prefix: String,
}

/// Body of `POST /enhance/objects`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceObjectsRequest {
    #[serde(default)]
    pub images: Vec<ObjectRef>,
    pub profile_pic: Option<ObjectRef>,
    pub scale: Option<u32>,
    #[serde(default)]
    pub output: OutputLocation,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResult {
    pub input_key: String,
    pub output_key: String,
    pub width: u32,
    pub height: u32,
    pub mime: String,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceObjectsResponse {
    pub results: Vec<ObjectResult>,
    // `{}` rather than `null` when there is no profile picture result
    #[serde(serialize_with = "empty_object_if_none")]
    pub profile_pic_result: Option<ObjectResult>,
}

fn empty_object_if_none<S>(value: &Option<ObjectResult>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(result) => result.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

/// Query parameters of `POST /upscale`
#[derive(Deserialize, Debug, Clone)]
pub struct ScaleQueryParam {
    pub scale: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enhance_response_wire_format() {
        assert_eq!(
            serde_json::to_value(EnhanceResponse::success("aGk=".into())).unwrap(),
            json!({ "status": true, "enhancedImage": "aGk=" })
        );
        assert_eq!(
            serde_json::to_value(EnhanceResponse::failure()).unwrap(),
            json!({ "status": false, "message": "Image enhancement failed" })
        );
    }

    #[test]
    fn test_objects_request_defaults() {
        let request: EnhanceObjectsRequest = serde_json::from_value(json!({
            "images": [{ "bucket": "my-bucket", "key": "users/u1/imgs/1.jpg" }, { "bucket": "b" }],
            "scale": 4,
            "output": { "bucket": "output-bucket" }
        }))
        .unwrap();

        assert_eq!(request.images.len(), 2);
        assert_eq!(
            request.images[0].location(),
            Some(("my-bucket", "users/u1/imgs/1.jpg"))
        );
        assert_eq!(request.images[1].location(), None);
        assert_eq!(request.output.prefix, "");
        assert!(request.profile_pic.is_none());
    }

    #[test]
    fn test_missing_profile_pic_result_serializes_as_empty_object() {
        let response = EnhanceObjectsResponse::default();
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({ "results": [], "profilePicResult": {} })
        );
    }
}
