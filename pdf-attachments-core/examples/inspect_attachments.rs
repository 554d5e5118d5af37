//! Print every attachment of a PDF and, optionally, extract one of them.
//!
//! ```text
//! cargo run --example inspect_attachments -- report.pdf [name]
//! ```

use pdf_attachments::{get_attachment, list_attachments};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <pdf> [attachment-name]", args[0]);
        process::exit(1);
    }

    let attachments = match list_attachments(&args[1]) {
        Ok(attachments) => attachments,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    println!("{} attachment(s)", attachments.len());
    for attachment in &attachments {
        println!("{attachment}");
    }

    if let Some(name) = args.get(2) {
        match get_attachment(&args[1], name) {
            Ok(attachment) => {
                let data = attachment.data.unwrap_or_default();
                println!("\n{name}: {} bytes", data.len());
                match std::str::from_utf8(&data) {
                    Ok(text) => println!("{text}"),
                    Err(_) => println!("(binary)"),
                }
            }
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
