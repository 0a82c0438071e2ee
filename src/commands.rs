//! This module defines the `Command` enum and its associated methods for parsing
//! and handling user commands in the FAT32 reader.
//!
//! The `Command` enum represents the commands that the user can input, such as opening
//! an image, listing a directory, printing a file, or handling invalid or unknown commands.

/// Represents a user command in the FAT32 reader.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Command to quit the program.
    Quit,
    /// Command to open a FAT32 image, encapsulating the file path as a `String`.
    Open(String),
    /// Command to print the layout of the open volume.
    Print,
    /// List a directory, the root one when no path is given.
    Ls(String),
    /// Print the metadata of an entry.
    Stat(String),
    /// Print the content of a file, optionally from an offset and for a length.
    Cat {
        path: String,
        offset: u64,
        len: Option<usize>,
    },
    /// Print the directory tree of the volume.
    Tree,
    /// Command for an unknown input, encapsulating the raw input as a `String`.
    Unknown(String),
    /// Command for invalid input, encapsulating an error message as a `String`.
    Invalid(String),
    /// Command for an empty input.
    Empty,
}

impl Command {
    /// Parses a string into a `Command` instance.
    ///
    /// # Parameters
    /// - `s`: A string slice representing the user input.
    ///
    /// # Returns
    /// - `Command::Quit` if the input is "quit".
    /// - `Command::Open` with the file path if the input starts with "open" followed by a valid argument.
    /// - `Command::Print` if the input is "print".
    /// - `Command::Ls` if the input starts with "ls", with "/" as default path.
    /// - `Command::Stat` if the input starts with "stat" followed by a path.
    /// - `Command::Cat` if the input starts with "cat" followed by a path, an optional offset and an optional length.
    /// - `Command::Tree` if the input is "tree".
    /// - `Command::Unknown` if the input does not match any known command.
    /// - `Command::Invalid` if an argument is missing or cannot be parsed.
    /// - `Command::Empty` if the input is empty or contains only whitespace.
    pub fn from_string(s: &str) -> Self {
        let mut parts = s.split_whitespace();
        match parts.next() {
            Some("quit") => Command::Quit,
            Some("open") => match parts.next() {
                Some(arg) => Command::Open(arg.to_string()),
                None => Command::Invalid(String::from(
                    "Missing arg: 'open' expects the path to a '.img' file.",
                )),
            },
            Some("print") => Command::Print,
            Some("ls") => Command::Ls(parts.next().unwrap_or("/").to_string()),
            Some("stat") => match parts.next() {
                Some(arg) => Command::Stat(arg.to_string()),
                None => Command::Invalid(String::from("Missing arg: 'stat' expects a path.")),
            },
            Some("cat") => Self::parse_cat(parts),
            Some("tree") => Command::Tree,
            Some(other) => Command::Unknown(other.to_string()),
            None => Command::Empty,
        }
    }

    fn parse_cat<'a>(mut parts: impl Iterator<Item = &'a str>) -> Self {
        let path = match parts.next() {
            Some(arg) => arg.to_string(),
            None => {
                return Command::Invalid(String::from("Missing arg: 'cat' expects a path."));
            }
        };
        let offset = match parts.next().map(str::parse::<u64>) {
            None => 0,
            Some(Ok(offset)) => offset,
            Some(Err(_)) => {
                return Command::Invalid(String::from(
                    "Arg parsing error: 'cat' expects an unsigned integer as offset.",
                ));
            }
        };
        let len = match parts.next().map(str::parse::<usize>) {
            None => None,
            Some(Ok(len)) => Some(len),
            Some(Err(_)) => {
                return Command::Invalid(String::from(
                    "Arg parsing error: 'cat' expects an unsigned integer as length.",
                ));
            }
        };

        Command::Cat { path, offset, len }
    }
}
