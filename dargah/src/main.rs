mod demo;

use dargah::{GatewayClient, PaymentRequest, TrackId, Verification};
use demo::Config;
use env_logger::Env;
use log::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .init();

    let client = GatewayClient::try_new(&config.zibal)?;
    info!(
        "Using merchant {} at {}",
        client.merchant(),
        config.zibal.api_url
    );

    if let Some(track_id) = config.track_id {
        match client.verify_payment(TrackId::new(track_id)).await? {
            Verification::Verified(result) => {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Verification::AlreadyVerified => println!("Payment {track_id} was already verified"),
            Verification::NotYetPaid => println!("Payment {track_id} is not paid yet"),
        }
        return Ok(());
    }

    let request = PaymentRequest::new(config.amount, config.callback_url)
        .description(config.description);
    let track_id = client.initiate_payment(&request).await?;
    println!("trackId: {track_id}");
    println!("redirect: {}", client.redirect_url(track_id));

    Ok(())
}
