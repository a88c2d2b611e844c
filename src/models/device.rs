use serde::{Deserialize, Serialize};

/// Body for POST /api/user/devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    #[serde(rename = "deviceType")]
    pub device_type: String,
    #[serde(rename = "deviceToken")]
    pub device_token: String,
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(rename = "pushEnabled")]
    pub push_enabled: bool,
}

impl DeviceRegistration {
    /// Describes the running host. The token comes from whatever push
    /// transport the caller wired in.
    pub fn for_this_host(device_token: String) -> Self {
        DeviceRegistration {
            device_type: std::env::consts::OS.to_string(),
            device_token,
            device_name: hostname(),
            push_enabled: true,
        }
    }
}

/// Body for PUT /api/user/devices/{id}. The update endpoint takes the bare
/// `token` field, unlike the registration POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTokenUpdate {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegisterResponse {
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "terminal".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_serializes_camel_case() {
        let registration = DeviceRegistration {
            device_type: "linux".to_string(),
            device_token: "tok-1".to_string(),
            device_name: "workstation".to_string(),
            push_enabled: true,
        };
        let json = serde_json::to_value(&registration).expect("Failed to serialize registration");
        assert_eq!(json["deviceType"], "linux");
        assert_eq!(json["deviceToken"], "tok-1");
        assert_eq!(json["pushEnabled"], true);
    }

    #[test]
    fn test_token_update_serializes_bare_token() {
        let update = DeviceTokenUpdate {
            token: "tok-2".to_string(),
        };
        let json = serde_json::to_value(&update).expect("Failed to serialize update");
        assert_eq!(json["token"], "tok-2");
        assert!(json.get("deviceToken").is_none());
    }

    #[test]
    fn test_register_response_without_id() {
        let parsed: DeviceRegisterResponse =
            serde_json::from_str("{}").expect("Failed to parse empty response");
        assert!(parsed.device_id.is_none());
    }
}
