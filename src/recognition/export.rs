//! Raster export and transcript file.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Generate a filename from a chrono template, ensuring a `.png` extension.
pub fn generate_filename(template: &str) -> String {
    let name = Local::now().format(template).to_string();
    if name.to_lowercase().ends_with(".png") {
        name
    } else {
        format!("{}.png", name)
    }
}

/// Write PNG bytes into `directory`, never overwriting an existing file.
pub fn export_png(png: &[u8], directory: &Path, template: &str) -> io::Result<PathBuf> {
    if !directory.exists() {
        log::info!("Creating export directory: {}", directory.display());
        fs::create_dir_all(directory)?;
    }

    let filename = generate_filename(template);
    let mut path = directory.join(&filename);
    let stem = filename.trim_end_matches(".png").to_string();
    let mut counter = 1;
    while path.exists() {
        path = directory.join(format!("{}-{}.png", stem, counter));
        counter += 1;
    }

    fs::write(&path, png)?;
    log::info!("Drawing exported to {} ({} bytes)", path.display(), png.len());
    Ok(path)
}

/// Append one recognized text to the transcript file.
pub fn append_transcript(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "Texto reconocido: {}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_gets_png_extension() {
        assert_eq!(generate_filename("dibujo"), "dibujo.png");
        assert_eq!(generate_filename("fixed.png"), "fixed.png");
        assert!(generate_filename("dibujo_%Y").starts_with("dibujo_2"));
    }

    #[test]
    fn exports_do_not_overwrite() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("out");
        let first = export_png(b"one", &dir, "same").unwrap();
        let second = export_png(b"two", &dir, "same").unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
        assert!(second.ends_with("same-1.png"));
    }

    #[test]
    fn transcript_appends_lines() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("texto_reconocido.txt");
        append_transcript(&path, "HOLA").unwrap();
        append_transcript(&path, "MUNDO").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Texto reconocido: HOLA\nTexto reconocido: MUNDO\n"
        );
    }
}
