//! Configuration validation.
//!
//! Every check pushes a message; all problems are reported together in one
//! `ConfigError::ValidationError`.

use std::net::IpAddr;

use telestrator_common::ConfigError;

use crate::schema::TelestratorConfig;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TelestratorConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_min(&mut errors, "relay.outbound_buffer", config.relay.outbound_buffer, 1);
    validate_min(
        &mut errors,
        "snapshot.listener_buffer",
        config.snapshot.listener_buffer,
        1,
    );
    if config.logging.filter.trim().is_empty() {
        errors.push("logging.filter must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &TelestratorConfig) {
    let server = &config.server;
    if server.port == 0 {
        errors.push("server.port must be non-zero".into());
    }
    match server.signaling_port {
        Some(0) => errors.push("server.signaling_port must be non-zero".into()),
        Some(port) if port == server.port && overlaps(server.http_bind, server.signaling_bind) => {
            errors.push(format!(
                "server.signaling_port = {port} collides with the http listener"
            ));
        }
        None if server.port == u16::MAX => {
            errors.push("server.port = 65535 leaves no room for the signaling port".into());
        }
        _ => {}
    }
}

/// Whether two bind addresses can claim the same port. A wildcard address
/// binds every interface, so it overlaps anything.
fn overlaps(a: IpAddr, b: IpAddr) -> bool {
    a == b || a.is_unspecified() || b.is_unspecified()
}

fn validate_min(errors: &mut Vec<String>, name: &str, value: usize, min: usize) {
    if value < min {
        errors.push(format!("{name} = {value} must be at least {min}"));
    }
}
