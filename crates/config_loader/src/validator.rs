//! 配置校验模块
//!
//! 校验规则：
//! - tick_interval_ms > 0
//! - packet_sink 是合法的 socket 地址
//! - udp 传输必须配置 marker_bind / publish_addr
//! - outputs 的 source_id 非空且唯一
//! - preflight 命令与期望输出非空

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{BridgeConfig, ContractError, TransportKind};

/// 校验 BridgeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_bridge_settings(config)?;
    validate_transport(config)?;
    validate_outputs(config)?;
    validate_preflight(config)?;
    Ok(())
}

/// 校验驱动参数
fn validate_bridge_settings(config: &BridgeConfig) -> Result<(), ContractError> {
    let bridge = &config.bridge;
    if bridge.tick_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "bridge.tick_interval_ms",
            "tick_interval_ms must be > 0",
        ));
    }
    if let Some(addr) = &bridge.packet_sink {
        validate_socket_addr("bridge.packet_sink", addr)?;
    }
    Ok(())
}

/// 校验传输配置
fn validate_transport(config: &BridgeConfig) -> Result<(), ContractError> {
    let transport = &config.transport;
    if transport.kind != TransportKind::Udp {
        return Ok(());
    }

    let marker_bind = transport.marker_bind.as_deref().ok_or_else(|| {
        ContractError::config_validation("transport.marker_bind", "required for udp transport")
    })?;
    validate_socket_addr("transport.marker_bind", marker_bind)?;

    let publish_addr = transport.publish_addr.as_deref().ok_or_else(|| {
        ContractError::config_validation("transport.publish_addr", "required for udp transport")
    })?;
    validate_socket_addr("transport.publish_addr", publish_addr)?;

    Ok(())
}

/// 校验 source_id 唯一性
fn validate_outputs(config: &BridgeConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, output) in config.outputs.iter().enumerate() {
        if output.source_id.is_empty() {
            return Err(ContractError::config_validation(
                format!("outputs[{}].source_id", idx),
                "source_id cannot be empty",
            ));
        }
        if !seen.insert(&output.source_id) {
            return Err(ContractError::config_validation(
                format!("outputs[source_id={}]", output.source_id),
                "duplicate source_id",
            ));
        }
    }
    Ok(())
}

/// 校验 preflight 命令
fn validate_preflight(config: &BridgeConfig) -> Result<(), ContractError> {
    for (idx, cmd) in config.preflight.iter().enumerate() {
        if cmd.command.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("preflight[{}].command", idx),
                "command cannot be empty",
            ));
        }
        if cmd.expect.is_empty() {
            return Err(ContractError::config_validation(
                format!("preflight[{}].expect", idx),
                "expect cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_socket_addr(field: &str, addr: &str) -> Result<(), ContractError> {
    addr.parse::<SocketAddr>().map(|_| ()).map_err(|e| {
        ContractError::config_validation(field, format!("invalid address '{}': {}", addr, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{OutputEntry, PreflightCommand};

    fn minimal_config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.outputs.push(OutputEntry {
            source_id: "emotibit1".into(),
            path: "eda.json".into(),
        });
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zero_tick_interval() {
        let mut config = minimal_config();
        config.bridge.tick_interval_ms = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("tick_interval_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_invalid_packet_sink() {
        let mut config = minimal_config();
        config.bridge.packet_sink = Some("not-an-address".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("invalid address"), "got: {err}");
    }

    #[test]
    fn test_udp_requires_addresses() {
        let mut config = minimal_config();
        config.transport.kind = TransportKind::Udp;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("marker_bind"), "got: {err}");

        config.transport.marker_bind = Some("127.0.0.1:16571".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("publish_addr"), "got: {err}");

        config.transport.publish_addr = Some("127.0.0.1:16572".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_source_id() {
        let mut config = minimal_config();
        config.outputs.push(config.outputs[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate source_id"), "got: {err}");
    }

    #[test]
    fn test_empty_preflight_expect() {
        let mut config = minimal_config();
        config.preflight.push(PreflightCommand {
            command: "echo ok".into(),
            expect: String::new(),
        });
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
