//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use super::view::Row;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the credential table (ID, Website, Username, Password, Added).
pub fn print_credentials_table(rows: &[Row]) {
    if rows.is_empty() {
        info("No passwords saved yet.");
        tip("Run `securevault add <WEBSITE> <USERNAME>` to save your first one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Website", "Username", "Password", "Added"]);

    for row in rows {
        table.add_row(vec![
            row.id.to_string(),
            row.host.clone(),
            row.username.clone(),
            row.secret.clone(),
            row.added.clone(),
        ]);
    }

    println!("{table}");
}
