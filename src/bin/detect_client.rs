//! Manual smoke test for a running waste detection server.

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::ImageFormat;
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(about = "Test the waste detection API")]
struct Args {
    /// API base URL
    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    /// Path to test image
    #[arg(long)]
    image: Option<PathBuf>,
}

async fn check_health(client: &Client, url: &str) -> Result<()> {
    let response = client
        .get(format!("{url}/health"))
        .send()
        .await?
        .error_for_status()?;
    let body: Value = response.json().await?;

    println!("Health check response:");
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn check_detection(client: &Client, url: &str, image_path: &Path) -> Result<()> {
    if !image_path.exists() {
        bail!("Image file not found: {}", image_path.display());
    }

    let image = image::open(image_path)
        .with_context(|| format!("Failed to open {}", image_path.display()))?;
    println!(
        "Image loaded: {}, size: {}x{}, mode: {:?}",
        image_path.display(),
        image.width(),
        image.height(),
        image.color()
    );

    let bytes = tokio::fs::read(image_path).await?;
    let filename = image_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    let mime = ImageFormat::from_path(image_path)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/jpeg");

    let form = Form::new().part("image", Part::bytes(bytes).file_name(filename).mime_str(mime)?);

    println!("Sending request to {url}/detect");
    let response = client
        .post(format!("{url}/detect"))
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        let text = response.text().await.unwrap_or_default();
        bail!("Detection failed with status code {status}\nResponse: {text}");
    }

    let result: Value = response.json().await?;
    let detections = result
        .get("detections")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);

    println!("\nDetection successful!");
    println!(
        "Processing time: {}s",
        result
            .get("processing_time")
            .map(Value::to_string)
            .unwrap_or_else(|| "N/A".to_string())
    );
    println!("Detections: {detections}");
    println!(
        "Class counts: {}",
        result
            .get("class_counts")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let url = args.url.trim_end_matches('/').to_string();
    let client = Client::new();

    println!("Testing API at {url}");

    if let Err(e) = check_health(&client, &url).await {
        println!("Health check failed: {e}");
        println!("Health check failed, exiting");
        std::process::exit(1);
    }

    match &args.image {
        Some(image_path) => {
            if let Err(e) = check_detection(&client, &url, image_path).await {
                println!("Detection test failed: {e:#}");
                std::process::exit(1);
            }
        }
        None => {
            println!("\nNo test image provided. To test detection, use --image argument.");
        }
    }

    println!("\nAll tests passed!");
    Ok(())
}
