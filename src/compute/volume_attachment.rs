//! Block storage volumes attached to a server

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeAttachment {
    pub id: String,
    /// Device path inside the guest, e.g. `/dev/xvdb`
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default, rename = "serverId")]
    pub server_id: Option<String>,
    #[serde(default, rename = "volumeId")]
    pub volume_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_attachment() {
        let attachment: VolumeAttachment = serde_json::from_value(json!({
            "device": "/dev/xvdb",
            "id": "a26887c6-c47b-4654-abb5-dfadf7d3f803",
            "serverId": "4d8c3732-a248-40ed-bebc-539a6ffd25c0",
            "volumeId": "a26887c6-c47b-4654-abb5-dfadf7d3f803"
        }))
        .unwrap();

        assert_eq!(attachment.device.as_deref(), Some("/dev/xvdb"));
        assert_eq!(attachment.server_id.as_deref(), Some("4d8c3732-a248-40ed-bebc-539a6ffd25c0"));
    }
}
