//! Subcommands of the `mta-client` binary.
//!
//! Each command takes the client it talks to as a trait object, prints its
//! result to stdout and returns an error for `main` to report.

mod action;
mod info;
mod logs;
mod mta;
mod mtas;
mod operations;
mod purge;

pub use action::{ACTIONS, action};
pub use info::info;
pub use logs::mta_op_logs;
pub use mta::mta;
pub use mtas::mtas;
pub use operations::{ACTIVE_STATES, mta_ops};
pub use purge::purge_mta_config;

/// Prints rows as left-aligned columns under a header.
pub(crate) fn print_table(header: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let format_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("   ")
            .trim_end()
            .to_string()
    };

    println!("{}", format_row(header.to_vec()));
    for row in rows {
        println!("{}", format_row(row.iter().map(String::as_str).collect()));
    }
}
