//! Capture a scrolling region from the command line.
//!
//! Run with: cargo run --release --bin scrollcap -- <x> <y> <width> <height> [out.png]
//!
//! Scroll the content under the region; the capture stops on its own a few
//! seconds after the content stops growing.

use scrollstitch::{begin_capture, export, Region, SessionConfig, SessionEvent};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

const USAGE: &str = "usage: scrollcap <x> <y> <width> <height> [out.png]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let x: i32 = args.next().ok_or(USAGE)?.parse()?;
    let y: i32 = args.next().ok_or(USAGE)?.parse()?;
    let width: u32 = args.next().ok_or(USAGE)?.parse()?;
    let height: u32 = args.next().ok_or(USAGE)?.parse()?;
    let out = PathBuf::from(args.next().unwrap_or_else(|| "scrollcap.png".into()));

    // Keep any selection-border pixels out of the output.
    let region = Region::new(x, y, width, height)?.inset(2);

    println!(
        "Capturing {}x{} at ({}, {}). Scroll now; capture stops automatically.",
        region.width, region.height, region.x, region.y
    );

    let handle = begin_capture(region, SessionConfig::default());

    let event = loop {
        if let Some(event) = handle.try_wait() {
            break event;
        }
        print!("\rstitched rows: {}   ", handle.progress().total_height());
        std::io::stdout().flush()?;
        std::thread::sleep(Duration::from_millis(500));
    };
    println!();

    match event {
        SessionEvent::Completed(image) => {
            export::save_png(&image, &out)?;
            println!(
                "Saved {}x{} image to {}",
                image.width(),
                image.height(),
                out.display()
            );
            Ok(())
        }
        SessionEvent::Failed(reason) => Err(reason.into()),
    }
}
