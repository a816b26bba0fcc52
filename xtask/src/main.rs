use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const BIN_NAME: &str = "dia-browser-control";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let result = match args.first().map(String::as_str) {
        Some("man") => {
            let out_dir = args.get(1).map_or_else(|| PathBuf::from("man"), PathBuf::from);
            write_man_pages(&out_dir)
        }
        Some(other) => Err(io::Error::other(format!(
            "unknown xtask command: {other} (available: man)"
        ))),
        None => Err(io::Error::other("usage: cargo xtask man [OUT_DIR]")),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

/// Render one page for the binary and one per subcommand, recursively.
fn write_man_pages(out_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(out_dir)?;
    let cmd = dia_browser_control::command();

    let mut written = Vec::new();
    render(&cmd, BIN_NAME, out_dir, &mut written)?;

    for path in &written {
        println!("  {}", path.display());
    }
    println!("wrote {} man pages to {}", written.len(), out_dir.display());
    Ok(())
}

fn render(
    cmd: &clap::Command,
    page_name: &str,
    out_dir: &Path,
    written: &mut Vec<PathBuf>,
) -> io::Result<()> {
    let path = out_dir.join(format!("{page_name}.1"));
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut buf)?;
    fs::write(&path, buf)?;
    written.push(path);

    for sub in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
        let sub_name = format!("{page_name}-{}", sub.get_name());
        render(sub, &sub_name, out_dir, written)?;
    }
    Ok(())
}
