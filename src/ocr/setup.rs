use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const TRAINEDDATA: &str = "eng.traineddata";

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

#[cfg(windows)]
const SYSTEM_TESSERACT_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const SYSTEM_TESSERACT_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[cfg(windows)]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the per-user directory for downloaded Tesseract data.
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inventory-scanner")
        .join("tesseract")
}

/// Locates Tesseract and its English data, downloading the data if needed.
pub fn ensure_tesseract() -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;

    let tessdata = match find_tessdata_dir() {
        Some(dir) => dir,
        None => {
            let tessdata_dir = get_tesseract_dir().join("tessdata");
            fs::create_dir_all(&tessdata_dir).with_context(|| {
                format!("Failed to create {}", tessdata_dir.display())
            })?;
            download_tessdata(&tessdata_dir)?;
            tessdata_dir
        }
    };

    log(&format!(
        "Tesseract: {} (tessdata: {})",
        executable.display(),
        tessdata.display()
    ));

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads English trained data from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    let eng_url = format!("{}/{}", TESSDATA_REPO, TRAINEDDATA);
    let eng_path = tessdata_dir.join(TRAINEDDATA);

    log(&format!("Downloading {}...", TRAINEDDATA));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "inventory-scanner")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            TRAINEDDATA,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    fs::write(&eng_path, &bytes)
        .with_context(|| format!("Failed to write {}", eng_path.display()))?;

    log(&format!("Downloaded {} ({} bytes)", TRAINEDDATA, bytes.len()));

    Ok(())
}

/// Finds the Tesseract executable: next to the scanner, then PATH, then
/// common install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = crate::paths::get_exe_dir()
        .join("tesseract")
        .join(TESSERACT_EXE);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    SYSTEM_TESSERACT_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(TESSERACT_EXE))
        .find(|p| p.exists())
        .ok_or_else(|| {
            anyhow!(
                "Tesseract not found. Install Tesseract-OCR (https://github.com/UB-Mannheim/tesseract/releases) \
                 or copy it to {}",
                local_exe.display()
            )
        })
}

/// Finds a tessdata directory containing `eng.traineddata`.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let mut candidates = vec![
        crate::paths::get_exe_dir().join("tesseract").join("tessdata"),
        get_tesseract_dir().join("tessdata"),
    ];

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.extend(SYSTEM_TESSDATA_DIRS.iter().map(PathBuf::from));

    first_with_traineddata(&candidates)
}

fn first_with_traineddata(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| dir.join(TRAINEDDATA).exists())
        .cloned()
}
