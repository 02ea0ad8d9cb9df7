//! Wire protocol records.
//!
//! Commands come in from the UI as `{Cmd, Addr, Data}` JSON records;
//! updates go back out as `{Cmd, Addr, Data, Msg}` records, batched by the
//! flusher in `main`. Field names are capitalized on the wire.

use serde::{Deserialize, Serialize};

/// A command from the UI to the VM.
#[derive(Debug, Clone, Deserialize)]
pub struct VmCommand {
    #[serde(rename = "Cmd")]
    pub cmd: String,
    #[serde(rename = "Addr", default)]
    pub addr: i32,
    #[serde(rename = "Data", default)]
    pub data: String,
}

/// An update from the VM to the UI.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VmUpdate {
    #[serde(rename = "Cmd")]
    pub cmd: String,
    #[serde(rename = "Addr", skip_serializing_if = "Option::is_none")]
    pub addr: Option<i32>,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<i32>,
    #[serde(rename = "Msg", skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl VmUpdate {
    fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            addr: None,
            data: None,
            msg: None,
        }
    }

    /// A byte written to screen memory. The flusher merges runs of
    /// consecutive pokes into one update with a multi-character `Msg`.
    #[must_use]
    pub fn poke(addr: u16, value: u8) -> Self {
        Self {
            addr: Some(i32::from(addr)),
            data: Some(i32::from(value)),
            ..Self::new("poke")
        }
    }

    /// Motor light for a drive (-1 means the cassette).
    #[must_use]
    pub fn motor(drive: i32, on: bool) -> Self {
        Self {
            addr: Some(drive),
            data: Some(i32::from(on)),
            ..Self::new("motor")
        }
    }

    /// 32-column expanded screen mode on or off.
    #[must_use]
    pub fn expanded(on: bool) -> Self {
        Self {
            data: Some(i32::from(on)),
            ..Self::new("expanded")
        }
    }

    /// A breakpoint fired at the given PC.
    #[must_use]
    pub fn breakpoint(pc: u16) -> Self {
        Self {
            addr: Some(i32::from(pc)),
            ..Self::new("breakpoint")
        }
    }

    /// A diagnostic for the UI.
    #[must_use]
    pub fn message(msg: &str) -> Self {
        Self {
            msg: Some(msg.to_string()),
            ..Self::new("message")
        }
    }

    /// The VM is exiting.
    #[must_use]
    pub fn shutdown() -> Self {
        Self::new("shutdown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_serialize_with_wire_names() {
        let update = VmUpdate::poke(0x3C00, 0x48);
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"Cmd":"poke","Addr":15360,"Data":72}"#);

        let update = VmUpdate::shutdown();
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"Cmd":"shutdown"}"#);
    }

    #[test]
    fn commands_deserialize_with_defaults() {
        let cmd: VmCommand = serde_json::from_str(r#"{"Cmd":"boot"}"#).unwrap();
        assert_eq!(cmd.cmd, "boot");
        assert_eq!(cmd.addr, 0);
        assert_eq!(cmd.data, "");

        let cmd: VmCommand =
            serde_json::from_str(r#"{"Cmd":"press","Data":"A"}"#).unwrap();
        assert_eq!(cmd.data, "A");

        let cmd: VmCommand =
            serde_json::from_str(r#"{"Cmd":"add_breakpoint","Addr":4660}"#).unwrap();
        assert_eq!(cmd.addr, 0x1234);
    }
}
