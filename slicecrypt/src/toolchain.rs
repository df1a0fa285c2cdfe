use crate::utils;
use anyhow::{Result, anyhow, bail};
use colored::Colorize;
use log::{debug, info};
use regex::Regex;
use slicecrypt_core::SliceRecord;
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

/// External media operations needed around the selective cipher.
pub trait MediaToolchain {
    /// Video track of `input` as an Annex-B elementary stream.
    fn extract_elementary(&self, input: &Path) -> Result<Vec<u8>>;
    /// Audio track of `input` as ADTS, `None` when there is no audio stream.
    fn extract_audio(&self, input: &Path) -> Result<Option<Vec<u8>>>;
    /// One record per coded slice in decoding order.
    fn trace_qp(&self, input: &Path) -> Result<Vec<SliceRecord>>;
    /// Remux a raw H.264 stream, and optionally an audio track, into `output`.
    fn mux(&self, video: &Path, audio: Option<&Path>, output: &Path) -> Result<()>;
}

/// [`MediaToolchain`] backed by the `ffmpeg` and `ffprobe` binaries.
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Ffmpeg {
    pub fn locate() -> Result<Self> {
        Ok(Self {
            ffmpeg: utils::find_program("ffmpeg").ok_or_else(|| {
                anyhow!("could not find ffmpeg, make sure it is installed and available in PATH")
            })?,
            ffprobe: utils::find_program("ffprobe").ok_or_else(|| {
                anyhow!("could not find ffprobe, make sure it is installed and available in PATH")
            })?,
        })
    }

    fn run<S: AsRef<OsStr>>(&self, program: &Path, args: &[S]) -> Result<Output> {
        debug!(
            "executing {} {}",
            program.display(),
            args.iter()
                .map(|x| x.as_ref().to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            bail!(
                "{} exited with code {}",
                program
                    .file_name()
                    .map(|x| x.to_string_lossy())
                    .unwrap_or_default(),
                output.status.code().unwrap_or(1)
            );
        }

        Ok(output)
    }
}

impl MediaToolchain for Ffmpeg {
    fn extract_elementary(&self, input: &Path) -> Result<Vec<u8>> {
        let output = self.run(
            &self.ffmpeg,
            &[
                OsStr::new("-hide_banner"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-map"),
                OsStr::new("0:v:0"),
                OsStr::new("-c:v"),
                OsStr::new("copy"),
                OsStr::new("-bsf:v"),
                OsStr::new("h264_mp4toannexb"),
                OsStr::new("-an"),
                OsStr::new("-f"),
                OsStr::new("h264"),
                OsStr::new("pipe:1"),
            ],
        )?;

        if output.stdout.is_empty() {
            bail!("{} has no h264 video stream", input.display());
        }

        Ok(output.stdout)
    }

    fn extract_audio(&self, input: &Path) -> Result<Option<Vec<u8>>> {
        let probe = self.run(
            &self.ffprobe,
            &[
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-select_streams"),
                OsStr::new("a"),
                OsStr::new("-show_entries"),
                OsStr::new("stream=index"),
                OsStr::new("-of"),
                OsStr::new("csv=p=0"),
                input.as_os_str(),
            ],
        )?;

        if String::from_utf8_lossy(&probe.stdout).trim().is_empty() {
            return Ok(None);
        }

        let output = self.run(
            &self.ffmpeg,
            &[
                OsStr::new("-hide_banner"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-acodec"),
                OsStr::new("copy"),
                OsStr::new("-f"),
                OsStr::new("adts"),
                OsStr::new("pipe:1"),
            ],
        )?;

        Ok(Some(output.stdout))
    }

    fn trace_qp(&self, input: &Path) -> Result<Vec<SliceRecord>> {
        let output = self.run(
            &self.ffmpeg,
            &[
                OsStr::new("-hide_banner"),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-bsf:v"),
                OsStr::new("trace_headers"),
                OsStr::new("-f"),
                OsStr::new("null"),
                OsStr::new("-"),
            ],
        )?;

        Ok(TraceParser::new().parse(&String::from_utf8_lossy(&output.stderr)))
    }

    fn mux(&self, video: &Path, audio: Option<&Path>, output: &Path) -> Result<()> {
        let mut args = vec![
            OsStr::new("-hide_banner").to_owned(),
            OsStr::new("-y").to_owned(),
            OsStr::new("-i").to_owned(),
            video.as_os_str().to_owned(),
        ];

        if let Some(audio) = audio {
            args.extend_from_slice(&[OsStr::new("-i").to_owned(), audio.as_os_str().to_owned()]);
        }

        args.extend_from_slice(&[OsStr::new("-c:v").to_owned(), OsStr::new("copy").to_owned()]);

        if audio.is_some() {
            args.extend_from_slice(&[OsStr::new("-c:a").to_owned(), OsStr::new("aac").to_owned()]);
        }

        args.push(output.as_os_str().to_owned());

        info!(
            "Executing {} {}",
            "ffmpeg".bold(),
            args.iter()
                .map(|x| x.to_string_lossy())
                .map(|x| if x.contains(' ') {
                    format!("\"{x}\"")
                } else {
                    x.into_owned()
                })
                .collect::<Vec<_>>()
                .join(" ")
                .bold()
        );

        self.run(&self.ffmpeg, &args)?;
        Ok(())
    }
}

/// Parser for the log lines of ffmpeg's `trace_headers` bitstream filter.
///
/// Every NAL header sets the current unit type, each PPS sets the initial
/// picture qp and every slice header of a type 1 or 5 unit yields one
/// record with `qp = init_qp + slice_qp_delta`.
pub struct TraceParser {
    re_prefix: Regex,
}

impl TraceParser {
    pub fn new() -> Self {
        Self {
            re_prefix: Regex::new(r"^\[.*?\]\s*").unwrap(),
        }
    }

    pub fn parse(&self, log: &str) -> Vec<SliceRecord> {
        let mut records = Vec::new();
        let mut nal_type = None;
        let mut init_qp = 0;

        for line in log.lines().map(str::trim).filter(|x| !x.is_empty()) {
            let entry = self.re_prefix.replace(line, "");

            let Some(value) = entry
                .rsplit_once('=')
                .and_then(|(_, x)| x.trim().parse::<i32>().ok())
            else {
                continue;
            };

            if entry.contains("nal_unit_type") {
                nal_type = u8::try_from(value).ok();
            } else if entry.contains("pic_init_qp_minus26") {
                init_qp = value + 26;
            } else if entry.contains("slice_qp_delta")
                && let Some(x @ (1 | 5)) = nal_type
            {
                records.push(SliceRecord {
                    nal_type: x,
                    qp: init_qp + value,
                });
            }
        }

        records
    }
}

impl Default for TraceParser {
    fn default() -> Self {
        Self::new()
    }
}
