use control_my_spa::{Integration, SpaConfig, SpaState};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> control_my_spa::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => SpaConfig::from_file(path)?,
        None => {
            let username = env::var("CMS_USERNAME").expect("usage: monitor <config.json> or set CMS_USERNAME");
            let password = env::var("CMS_PASSWORD").expect("CMS_PASSWORD not set");
            SpaConfig::new(username, password)
        }
    };

    println!("Logging in as {}...", config.username);
    let integration = Integration::setup(config).await?;
    let info = integration.device_info();
    println!("{} {} ({}), firmware {}", info.manufacturer, info.model, info.serial_number, info.sw_version);

    integration.cache().on_event(|event| println!("{event:?}"));
    integration
        .cache()
        .register_subscriber(Arc::new(|state: Option<&SpaState>| -> control_my_spa::Result<()> {
            let Some(state) = state else {
                println!("Spa state unavailable");
                return Ok(());
            };
            let current = state
                .current_temp
                .map(|t| format!("{:.1}\u{00b0}F / {:.1}\u{00b0}C", t.fahrenheit(), t.display_celsius()))
                .unwrap_or_else(|| "--".to_string());
            println!(
                "water: {current} | target: {} | mode: {:?} | range: {:?}{}",
                state.desired_temp,
                state.heater_mode,
                state.temp_range,
                if state.panel_lock { " | LOCKED" } else { "" },
            );
            for c in &state.components {
                println!(
                    "  {:<16} port {:<3} {}",
                    c.component_type.as_vendor_str(),
                    c.port.as_deref().unwrap_or("-"),
                    c.value.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }));

    integration.cache().force_refresh().await;
    println!("Polling every {:?}. Ctrl-C to stop.", integration.cache().polling_interval());

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Signal error: {e}");
    }
    integration.shutdown();
    Ok(())
}
