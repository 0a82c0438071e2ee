//! This is the main entry point for the FAT32 reader.
//!
//! The program provides an interactive command-line interface over a FAT32 image.
//! Users can open an image, print its layout, browse its directories and print files.
//!
//! Usage: `main [-v...] [image]`. Each `-v` raises the log verbosity by one level.

use log::{error, warn};
use std::{
    env,
    fs::File,
    io::{self, Write},
};
use vfat_reader::commands::Command;
use vfat_reader::traits::{LayoutDisplay, TreeDisplay};
use vfat_reader::{FATError, FATVol, FileMetadata};

/// Represents the runtime state of the program.
///
/// This struct keeps track of the currently mounted volume and of the settings read
/// from the command line.
struct RunState {
    /// The currently mounted volume.
    volume: Option<FATVol<File>>,
    /// Count of `-v` flags given on the command line.
    verbosity: usize,
    /// Image to mount at startup.
    image: Option<String>,
}

impl RunState {
    fn from_args(args: impl Iterator<Item = String>) -> Self {
        let mut run_state = RunState {
            volume: None,
            verbosity: 0,
            image: None,
        };

        for arg in args {
            if arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v') {
                run_state.verbosity += arg.len() - 1;
            } else {
                run_state.image = Some(arg);
            }
        }

        run_state
    }
}

fn main() {
    let mut run_state = RunState::from_args(env::args().skip(1));

    // Warnings are shown by default.
    if let Err(err) = stderrlog::new()
        .module(module_path!())
        .module("vfat_reader")
        .verbosity(run_state.verbosity + 1)
        .init()
    {
        eprintln!("Logger initialisation failed: {err}");
    }

    if let Some(path) = run_state.image.take() {
        open(&mut run_state, &path);
    }

    loop {
        print!("> ");
        if let Err(err) = io::stdout().flush() {
            error!("{err}");
        }

        let mut s = String::new();
        match io::stdin().read_line(&mut s) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error!("Failed to read command: {err}");
                break;
            }
        }

        let cmd = Command::from_string(&s);
        let volume = run_state.volume.as_ref();

        match cmd {
            Command::Open(path) => open(&mut run_state, &path),
            Command::Quit => break,
            Command::Print => match volume {
                Some(vol) => match vol.display_layout(3) {
                    Ok(layout) => print!("{}\n{layout}", vol.bpb()),
                    Err(e) => error!("Print layout error: {e}"),
                },
                None => warn!("Open a FAT32 image first"),
            },
            Command::Ls(path) => match volume {
                Some(vol) => match vol.read_dir(&path) {
                    Ok(entries) => entries.iter().for_each(print_entry),
                    Err(err) => error!("ls {path}: {err}"),
                },
                None => warn!("Open a FAT32 image first"),
            },
            Command::Stat(path) => match volume {
                Some(vol) => match vol.resolve(&path) {
                    Ok(meta) => print_stat(&meta),
                    Err(err) => error!("stat {path}: {err}"),
                },
                None => warn!("Open a FAT32 image first"),
            },
            Command::Cat { path, offset, len } => match volume {
                Some(vol) => cat(vol, &path, offset, len),
                None => warn!("Open a FAT32 image first"),
            },
            Command::Tree => match volume {
                Some(vol) => match vol.display_tree() {
                    Ok(tree) => print!("{tree}"),
                    Err(err) => error!("Tree printing failed: {err}"),
                },
                None => warn!("Open a FAT32 image first"),
            },
            Command::Unknown(s) => error!("Unknown command: {s:?}"),
            Command::Invalid(s) => error!("{s}"),
            Command::Empty => {}
        }
    }
}

/// Mounts the image at `path`, replacing the volume currently open.
fn open(run_state: &mut RunState, path: &str) {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            error!("Can't open {path}: {err}");
            return;
        }
    };

    match FATVol::mount(file) {
        Ok(vol) => run_state.volume = Some(vol),
        Err(err) => error!("Mount of {path} failed: {err}"),
    }
}

fn print_entry(entry: &FileMetadata) {
    println!(
        "{:>7o} {:>10} {} {}{}",
        entry.mode(),
        entry.size(),
        entry.modified().format("%Y-%m-%d %H:%M:%S"),
        entry.name(),
        if entry.is_dir() { "/" } else { "" }
    );
}

fn print_stat(meta: &FileMetadata) {
    println!("  {:<12} {}", "Name", meta.name());
    println!("  {:<12} {}", "Cluster", meta.cluster());
    println!("  {:<12} {}", "Size", meta.size());
    println!("  {:<12} {:o}", "Mode", meta.mode());
    println!("  {:<12} {}", "Accessed", meta.accessed());
    println!("  {:<12} {}", "Modified", meta.modified());
    println!("  {:<12} {}", "Created", meta.created());
}

/// Prints `len` bytes of the file at `path`, from `offset` up to its end by default.
fn cat(vol: &FATVol<File>, path: &str, offset: u64, len: Option<usize>) {
    let meta = match vol.resolve(path) {
        Ok(meta) if meta.is_dir() => {
            error!("cat {path}: Is a directory");
            return;
        }
        Ok(meta) => meta,
        Err(err) => {
            error!("cat {path}: {err}");
            return;
        }
    };

    let remaining = (meta.size() as u64).saturating_sub(offset) as usize;
    let mut buf = vec![0u8; len.unwrap_or(remaining).min(remaining)];
    let read = match vol.read(&meta, offset, &mut buf) {
        Ok(read) => read,
        Err(FATError::PartialRead { read, source }) => {
            error!("cat {path}: only {read} bytes read: {source}");
            read
        }
        Err(err) => {
            error!("cat {path}: {err}");
            return;
        }
    };

    let mut stdout = io::stdout();
    if let Err(err) = stdout
        .write_all(&buf[..read])
        .and_then(|()| stdout.write_all(b"\n"))
    {
        error!("{err}");
    }
}
