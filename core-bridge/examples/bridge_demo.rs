//! Bridge lifecycle demonstration
//!
//! Drives an in-process "echo" engine through init, convert, port selection
//! and playback, with structured logging enabled.
//!
//! Run with:
//! ```bash
//! cargo run -p core-bridge --example bridge_demo
//!
//! # JSON logs
//! cargo run -p core-bridge --example bridge_demo -- json
//! ```

use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as EngineResult;
use bridge_traits::{
    EngineInstance, EngineModule, HostImports, LogLevel, ModuleInfo, Port, Position, RawEnvelope,
};
use core_bridge::{Balafon, CoreError};
use core_runtime::config::BridgeConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use tracing::{error, info};

/// Engine that "converts" by echoing its input and plays nothing.
struct EchoEngine;

impl EngineModule for EchoEngine {
    fn info(&self) -> ModuleInfo {
        ModuleInfo::new("echo", env!("CARGO_PKG_VERSION"))
    }

    fn instantiate(&self, imports: HostImports) -> EngineResult<Box<dyn EngineInstance>> {
        Ok(Box::new(EchoInstance { imports }))
    }
}

struct EchoInstance {
    imports: HostImports,
}

#[async_trait]
impl EngineInstance for EchoInstance {
    async fn run(self: Box<Self>) -> EngineResult<()> {
        let HostImports {
            mut registrar,
            console,
            ..
        } = self.imports;
        let ports = vec![Port::new(0, "Midi Through"), Port::new(1, "Echo Synth")];
        let selected = Arc::new(Mutex::new(None::<u32>));

        registrar
            .register_convert(|buffer, source| {
                if let Some(offset) = source.find('@') {
                    let line = source[..offset].matches('\n').count() + 1;
                    let column = offset - source[..offset].rfind('\n').map_or(0, |n| n + 1) + 1;
                    return RawEnvelope::convert_error(
                        "unexpected character '@'",
                        Position::new(offset, line, column),
                    );
                }
                let n = source.len().min(buffer.len());
                buffer[..n].copy_from_slice(&source.as_bytes()[..n]);
                RawEnvelope::converted(source.len(), None)
            })
            .register_list_ports({
                let ports = ports.clone();
                move || RawEnvelope::ports(ports.clone())
            })
            .register_select_port({
                let selected = Arc::clone(&selected);
                move |number| {
                    if !ports.iter().any(|port| port.number == number) {
                        return RawEnvelope::error(format!("no output port with number {}", number));
                    }
                    if let Ok(mut selected) = selected.lock() {
                        *selected = Some(number);
                    }
                    RawEnvelope::done()
                }
            })
            .register_play(move |source| {
                console.info(format!("playing {:?}", source.unwrap_or("<previous>")));
                RawEnvelope::done()
            });

        // Startup work happens before the signal.
        tokio::time::sleep(Duration::from_millis(50)).await;
        registrar.ready();

        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let format = match env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug)
            .with_spans(true),
    )?;

    let config = BridgeConfig::builder()
        .module(Arc::new(EchoEngine))
        .readiness_timeout(Duration::from_secs(5))
        .initial_buffer_capacity(16)
        .build()?;
    let balafon = Balafon::new(config);
    balafon.init().await?;

    let mut buffer = balafon.output_buffer();
    let converted = balafon.convert_growing(&mut buffer, ":assign c 60 d e f g").await?;
    info!(
        written = converted.written,
        capacity = buffer.capacity(),
        output = ?buffer.as_utf8(),
        "Converted"
    );

    if let Err(err) = balafon.convert(&mut buffer, "c d\ne @ f").await {
        error!(position = ?err.position(), "{}", err);
    }

    for port in balafon.list_ports().await? {
        info!("{}", port);
    }
    if let Err(err) = balafon.select_port(7).await {
        error!("{}", err);
    }
    balafon.select_port(1).await?;
    balafon.play(Some("c d e")).await?;
    balafon.play(None).await?;

    // Let the console entries drain.
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}
