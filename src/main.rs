//! # Folio CLI
//!
//! Usage:
//!   folio input.json -o layout.json
//!   echo '{ ... }' | folio
//!   folio --example > report.json
//!
//! Prints the laid-out geometry as JSON. Set `RUST_LOG=folio=debug` to
//! follow page and column decisions.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use folio::layout::LayoutInfo;
use folio::LayoutError;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_report_json());
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("✗ {e}");
        process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Failed to read {what}: {source}")]
    Read { what: String, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Failed to serialize layout: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn run(args: &[String]) -> Result<(), CliError> {
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).map_err(|source| CliError::Read {
            what: args[1].clone(),
            source,
        })?
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| CliError::Read {
                what: "stdin".to_string(),
                source,
            })?;
        buf
    };

    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone());

    let layout = folio::layout_json(&input)?;
    let info = LayoutInfo::from_document(&layout);
    let json = serde_json::to_string_pretty(&info)?;

    match output_path {
        Some(path) => {
            fs::write(&path, &json).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            eprintln!(
                "✓ Laid out {} page(s), written to {}",
                info.pages.len(),
                path
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn example_report_json() -> &'static str {
    r##"{
  "defaultPage": {
    "size": "A4",
    "margin": { "top": 54, "right": 54, "bottom": 54, "left": 54 }
  },
  "children": [
    {
      "kind": { "type": "PageHeader" },
      "style": { "padding": { "bottom": 12 } },
      "children": [
        {
          "kind": { "type": "Text", "content": "Quarterly Field Report" },
          "style": { "fontSize": 10, "fontWeight": 700, "textAlign": "Right" }
        }
      ]
    },
    {
      "kind": { "type": "PageFooter" },
      "children": [
        {
          "kind": { "type": "Canvas", "width": 24, "height": 24 },
          "id": "logo",
          "children": [
            {
              "kind": { "type": "Panel" },
              "style": { "position": "Absolute", "left": 4, "top": 4, "width": { "Pt": 16 }, "height": { "Pt": 16 } }
            }
          ]
        }
      ]
    },
    {
      "kind": { "type": "Text", "content": "Summary" },
      "style": { "fontSize": 24, "fontWeight": 700, "margin": { "bottom": 12 } }
    },
    {
      "kind": { "type": "Panel" },
      "style": {
        "columnCount": 2,
        "columnGap": 18,
        "textAlign": "Justify"
      },
      "children": [
        {
          "kind": { "type": "Text", "content": "Sampling ran across all twelve sites this quarter. Water clarity improved at the northern stations, while the two estuary sites showed the seasonal rise in turbidity we expected after the spring floods. Instrument drift stayed within tolerance on every logger." }
        },
        {
          "kind": { "type": "Text", "content": "Next quarter we move the upstream logger to the new bridge pier and add a second conductivity probe at the weir." },
          "style": { "margin": { "top": 8 } }
        }
      ]
    },
    {
      "kind": { "type": "Panel" },
      "id": "callout",
      "style": {
        "position": "Relative",
        "top": 6,
        "margin": { "top": 18 },
        "padding": { "top": 10, "right": 10, "bottom": 10, "left": 10 },
        "borderWidth": { "top": 1, "right": 1, "bottom": 1, "left": 1 }
      },
      "children": [
        {
          "kind": { "type": "Text", "content": "Readings flagged for review" },
          "style": { "fontWeight": 700 }
        },
        {
          "kind": { "type": "Text", "content": "3 of 144" },
          "style": { "position": "Absolute", "right": 10, "top": 10 }
        }
      ]
    }
  ]
}
"##
}
