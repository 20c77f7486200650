use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name documents read from stdin run under.
const STDIN_NAME: &str = "document";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            Input::Stdin
        } else {
            Input::File(PathBuf::from(arg))
        }
    }

    pub fn read(&self) -> io::Result<String> {
        match self {
            Input::Stdin => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                Ok(text)
            }
            Input::File(path) => std::fs::read_to_string(path),
        }
    }

    /// Base name the document runs under.
    pub fn document_name(&self) -> String {
        match self {
            Input::Stdin => STDIN_NAME.to_string(),
            Input::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| STDIN_NAME.to_string()),
        }
    }

    /// `<stem>.md`
    fn output_file_name(&self) -> PathBuf {
        match self {
            Input::Stdin => PathBuf::from(STDIN_NAME).with_extension("md"),
            Input::File(path) => path
                .with_extension("md")
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(STDIN_NAME).with_extension("md")),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => write!(f, "<stdin>"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("stdin ('-') can only be given once")]
    RepeatedStdin,

    #[error("cannot write {count} inputs to the single file '{}'", path.display())]
    ManyToOne { count: usize, path: PathBuf },

    #[error("input and output are the same file: '{}'", .0.display())]
    Collision(PathBuf),

    #[error("two inputs would both be written to '{}'", .0.display())]
    DuplicateOutput(PathBuf),

    #[error("output file '{}' already exists (use --force to overwrite)", .0.display())]
    Exists(PathBuf),
}

/// Decide where each input's output goes.
///
/// `output` is `-` (or `quiet`) for stdout, `.` for `<stem>.md` next to
/// each input, an existing directory, or a file path for a single input.
/// Without it, stdin goes to stdout and files go next to the input.
pub fn plan(
    inputs: &[Input],
    output: Option<&str>,
    force: bool,
) -> Result<Vec<(Input, Destination)>, OutputError> {
    if inputs.iter().filter(|input| **input == Input::Stdin).count() > 1 {
        return Err(OutputError::RepeatedStdin);
    }

    let mut planned: Vec<(Input, Destination)> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let destination = match output {
            Some("-" | "quiet") => Destination::Stdout,
            Some(".") => match input {
                Input::Stdin => Destination::File(input.output_file_name()),
                Input::File(path) => Destination::File(path.with_extension("md")),
            },
            Some(dir) if Path::new(dir).is_dir() => {
                Destination::File(Path::new(dir).join(input.output_file_name()))
            }
            Some(file) if inputs.len() > 1 => {
                return Err(OutputError::ManyToOne {
                    count: inputs.len(),
                    path: PathBuf::from(file),
                });
            }
            Some(file) => Destination::File(PathBuf::from(file)),
            None => match input {
                Input::Stdin => Destination::Stdout,
                Input::File(path) => Destination::File(path.with_extension("md")),
            },
        };

        if let Destination::File(path) = &destination {
            let collides = inputs.iter().any(|other| match other {
                Input::File(input_path) => same_file(input_path, path),
                Input::Stdin => false,
            });
            if collides {
                return Err(OutputError::Collision(path.clone()));
            }
            if planned
                .iter()
                .any(|(_, earlier)| matches!(earlier, Destination::File(p) if same_file(p, path)))
            {
                return Err(OutputError::DuplicateOutput(path.clone()));
            }
            if path.exists() && !force {
                return Err(OutputError::Exists(path.clone()));
            }
        }

        log::debug!("{} -> {:?}", input, destination);
        planned.push((input.clone(), destination));
    }
    Ok(planned)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(path: &Path) -> Input {
        Input::File(path.to_path_buf())
    }

    #[test]
    fn stdin_defaults_to_stdout() {
        let planned = plan(&[Input::Stdin], None, false).unwrap();
        assert_eq!(planned, vec![(Input::Stdin, Destination::Stdout)]);
        assert_eq!(Input::Stdin.document_name(), "document");
    }

    #[test]
    fn file_defaults_to_markdown_sibling() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("guide.tfd");
        let planned = plan(&[file(&input)], None, false).unwrap();
        assert_eq!(planned[0].1, Destination::File(dir.path().join("guide.md")));
    }

    #[test]
    fn directory_output_maps_every_input() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let inputs = [file(&dir.path().join("a.tfd")), Input::Stdin];
        let planned = plan(&inputs, out.to_str(), false).unwrap();
        assert_eq!(planned[0].1, Destination::File(out.join("a.md")));
        assert_eq!(planned[1].1, Destination::File(out.join("document.md")));
    }

    #[test]
    fn dot_means_next_to_each_input() {
        let dir = TempDir::new().unwrap();
        let inputs = [
            file(&dir.path().join("x").join("a.tfd")),
            file(&dir.path().join("y").join("b.tfd")),
            Input::Stdin,
        ];
        let planned = plan(&inputs, Some("."), false).unwrap();
        assert_eq!(planned[0].1, Destination::File(dir.path().join("x").join("a.md")));
        assert_eq!(planned[1].1, Destination::File(dir.path().join("y").join("b.md")));
        assert_eq!(planned[2].1, Destination::File(PathBuf::from("document.md")));
    }

    #[test]
    fn many_inputs_to_one_file_is_refused() {
        let dir = TempDir::new().unwrap();
        let inputs = [file(&dir.path().join("a.tfd")), file(&dir.path().join("b.tfd"))];
        let target = dir.path().join("all.md");
        let err = plan(&inputs, target.to_str(), false).unwrap_err();
        assert!(matches!(err, OutputError::ManyToOne { count: 2, .. }));
    }

    #[test]
    fn stdin_only_once() {
        let err = plan(&[Input::Stdin, Input::Stdin], Some("-"), false).unwrap_err();
        assert!(matches!(err, OutputError::RepeatedStdin));
    }

    #[test]
    fn refuses_input_output_collision() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.md");
        std::fs::write(&input, "# A\n").unwrap();
        let err = plan(&[file(&input)], None, true).unwrap_err();
        assert!(matches!(err, OutputError::Collision(_)));
    }

    #[test]
    fn existing_output_needs_force() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("doc.tfd");
        std::fs::write(dir.path().join("doc.md"), "old").unwrap();
        assert!(matches!(
            plan(&[file(&input)], None, false),
            Err(OutputError::Exists(_))
        ));
        assert!(plan(&[file(&input)], None, true).is_ok());
    }

    #[test]
    fn same_stem_in_one_directory_is_refused() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let inputs = [
            file(&dir.path().join("x").join("doc.tfd")),
            file(&dir.path().join("y").join("doc.tfd")),
        ];
        let err = plan(&inputs, out.to_str(), false).unwrap_err();
        assert!(matches!(err, OutputError::DuplicateOutput(_)));
    }
}
