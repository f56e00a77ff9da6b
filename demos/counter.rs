//! Count up on an attached Nixie Pipe array.
//!
//! Auto-detects the device, paints it blue, counts to 9999, then reads the
//! displayed number back.
//!
//! ```sh
//! cargo run --example counter
//! ```

use nixiepipe::Device;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let device = Device::builder().connect().await?;
    println!("connected, firmware {}", device.firmware_version());

    device.set_colour(0, 0, 255)?;
    device.show()?;

    for x in 0..=9999 {
        device.set_number(x)?;
        device.show()?;
    }

    let shown = device.get_number().await?;
    println!("displaying: {shown}");

    Ok(())
}
