// Cashback messages exchanged between the background and other contexts
// Wire shape is `{ "type": "...", ...payload }`

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    GetCashbackAddress,
    DeleteCashbackAddress,
    SetCashbackAddress {
        #[serde(default)]
        address: Option<String>,
    },
    OpenCashbackSelection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    GetCashbackAddress,
    DeleteCashbackAddress,
    SetCashbackAddress,
    OpenCashbackSelection,
}

impl RequestKind {
    pub fn from_type(ty: &str) -> Option<Self> {
        match ty {
            "GET_CASHBACK_ADDRESS" => Some(Self::GetCashbackAddress),
            "DELETE_CASHBACK_ADDRESS" => Some(Self::DeleteCashbackAddress),
            "SET_CASHBACK_ADDRESS" => Some(Self::SetCashbackAddress),
            "OPEN_CASHBACK_SELECTION" => Some(Self::OpenCashbackSelection),
            _ => None,
        }
    }

    /// Kind of a raw runtime message, `None` if it isn't a cashback request
    pub fn of_message(message: &Value) -> Option<Self> {
        message.get("type").and_then(Value::as_str).and_then(Self::from_type)
    }

    /// The reply a request of this kind gets when it can't be served
    pub fn failure(&self, error: Option<String>) -> Response {
        match self {
            Self::GetCashbackAddress => Response::Address(AddressReply { address: None }),
            Self::DeleteCashbackAddress => Response::Status(StatusReply::failed(None)),
            Self::SetCashbackAddress | Self::OpenCashbackSelection => {
                Response::Status(StatusReply::failed(error))
            }
        }
    }
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::GetCashbackAddress => RequestKind::GetCashbackAddress,
            Request::DeleteCashbackAddress => RequestKind::DeleteCashbackAddress,
            Request::SetCashbackAddress { .. } => RequestKind::SetCashbackAddress,
            Request::OpenCashbackSelection => RequestKind::OpenCashbackSelection,
        }
    }

    pub fn to_message(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)] // keeps `{ success }` from parsing as an empty address reply
pub struct AddressReply {
    pub address: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StatusReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: Option<String>) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Response {
    Address(AddressReply),
    Status(StatusReply),
}

impl Response {
    pub fn to_message(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Broadcast from the background to every open context
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    CashbackWalletUpdated { address: Option<String> },
}

impl Notification {
    pub fn wallet_updated(address: Option<&str>) -> Self {
        Notification::CashbackWalletUpdated {
            address: address.map(str::to_string),
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Notification::CashbackWalletUpdated { address } => address.as_deref(),
        }
    }

    /// Parse an incoming runtime message, `None` for anything else
    pub fn from_message(message: &Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }

    pub fn to_message(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
