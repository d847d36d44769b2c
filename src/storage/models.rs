use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one uploaded file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    /// Client-supplied name. Untrusted; used for display and as the download name.
    pub original_name: String,
    /// On-disk name, the key for both the object store and the registry.
    #[serde(rename = "filename")]
    pub stored_name: String,
    pub size: u64,
    /// Client-declared MIME type. Informational only.
    #[serde(rename = "mimetype")]
    pub content_type: String,
    #[serde(rename = "uploadTime")]
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let record = FileRecord {
            id: "abc".to_string(),
            original_name: "a.txt".to_string(),
            stored_name: "1700000000000-a.txt".to_string(),
            size: 2,
            content_type: "text/plain".to_string(),
            uploaded_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["filename", "id", "mimetype", "originalName", "size", "uploadTime"]
        );
        assert_eq!(obj["filename"], "1700000000000-a.txt");
        assert_eq!(obj["size"], 2);
    }
}
