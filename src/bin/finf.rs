//! finf CLI: XML <-> Fast Infoset conversion.

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Args, Parser, Subcommand};
use fastinfoset::options::{DecoderOptions, EncoderOptions, Ignore};
use fastinfoset::xml::{fi_reader_to_xml, xml_reader_to_fi};
use std::io::{BufReader, IsTerminal, Read, Write};
use std::process;

#[derive(Parser)]
#[command(name = "finf", about = "XML <-> Fast Infoset conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode XML to Fast Infoset
    Encode(EncodeArgs),
    /// Decode Fast Infoset to XML
    Decode(DecodeArgs),
}

#[derive(Args)]
struct IoArgs {
    /// Input file (- for stdin)
    #[arg(short, long)]
    input: String,

    /// Output file (optional; without -o auto-derived, -o - = stdout)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    io: IoArgs,

    // -- Ignore --
    /// Drop comments
    #[arg(long)]
    ignore_comments: bool,

    /// Drop processing instructions
    #[arg(long)]
    ignore_pis: bool,

    /// Drop whitespace-only character data
    #[arg(long)]
    ignore_whitespace: bool,

    /// Encode all character data as CDATA sections
    #[arg(long)]
    cdata: bool,

    // -- Vokabular --
    /// Attribute values up to this many characters are added to the vocabulary
    #[arg(long, default_value_t = fastinfoset::options::DEFAULT_SIZE_LIMIT)]
    attribute_value_limit: usize,

    /// Character chunks up to this many characters are added to the vocabulary
    #[arg(long, default_value_t = fastinfoset::options::DEFAULT_SIZE_LIMIT)]
    chunk_limit: usize,

    // -- Header --
    /// Write the XML declaration in front of the document
    #[arg(long)]
    xml_declaration: bool,

    /// Standalone property (true/false)
    #[arg(long)]
    standalone: Option<bool>,

    /// XML version property
    #[arg(long)]
    xml_version: Option<String>,
}

impl EncodeArgs {
    fn to_options(&self) -> EncoderOptions {
        let mut opts = EncoderOptions::default()
            .with_ignore(Ignore {
                comments: self.ignore_comments,
                processing_instructions: self.ignore_pis,
                whitespace_text: self.ignore_whitespace,
            })
            .with_attribute_value_size_limit(self.attribute_value_limit)
            .with_character_chunk_size_limit(self.chunk_limit);
        if self.cdata {
            opts = opts.with_characters_as_cdata();
        }
        if self.xml_declaration {
            opts = opts.with_xml_declaration();
        }
        if let Some(standalone) = self.standalone {
            opts = opts.with_standalone(standalone);
        }
        if let Some(version) = &self.xml_version {
            opts = opts.with_version(version.clone());
        }
        opts
    }
}

#[derive(Args)]
struct DecodeArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Write data of unknown encoding algorithms as base64 instead of failing
    #[arg(long)]
    octets_for_unknown_algorithms: bool,
}

impl DecodeArgs {
    fn to_options(&self) -> DecoderOptions {
        let opts = DecoderOptions::default();
        if self.octets_for_unknown_algorithms {
            opts.with_octets_for_unknown_algorithms()
        } else {
            opts
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
    }
}

fn run_encode(args: EncodeArgs) -> Result<(), String> {
    let opts = args.to_options();
    opts.validate()
        .map_err(|e| format!("Ungueltige Optionen: {e}"))?;

    let output_path = resolve_output_path(args.io.output.as_deref(), &args.io.input, "finf")?;

    if args.io.input == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        let stdin = std::io::stdin();
        write_to_output(&output_path, |mut writer| {
            xml_reader_to_fi(stdin.lock(), &opts, &mut writer)
                .map_err(|e| format!("Encode-Fehler: {e}"))?;
            writer.flush().map_err(|e| format!("Schreibfehler: {e}"))
        })
    } else {
        let file = std::fs::File::open(&args.io.input)
            .map_err(|e| format!("Lesefehler '{}': {e}", args.io.input))?;
        write_to_output(&output_path, |mut writer| {
            xml_reader_to_fi(BufReader::new(file), &opts, &mut writer)
                .map_err(|e| format!("Encode-Fehler: {e}"))?;
            writer.flush().map_err(|e| format!("Schreibfehler: {e}"))
        })
    }
}

fn run_decode(args: DecodeArgs) -> Result<(), String> {
    let opts = args.to_options();
    let input = load_decode_input(&args.io.input)?;
    let data: &[u8] = &input;

    let output_path = resolve_output_path(args.io.output.as_deref(), &args.io.input, "xml")?;
    write_to_output(&output_path, |mut writer| {
        fi_reader_to_xml(data, &opts, &mut writer)
            .map_err(|e| format!("Decode-Fehler: {e}"))?;
        writer.flush().map_err(|e| format!("Schreibfehler: {e}"))
    })
}

fn read_input(path: &str) -> Result<Vec<u8>, String> {
    if path == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("Lesefehler (stdin): {e}"))?;
        Ok(buf)
    } else {
        std::fs::read(path).map_err(|e| format!("Lesefehler '{}': {e}", path))
    }
}

/// Besitzer der Decode-Eingabedaten. Haelt entweder eine Mmap oder einen Vec<u8> am Leben,
/// damit der zurueckgegebene &[u8] Slice gueltig bleibt.
enum DecodeInput {
    Buf(Vec<u8>),
    #[cfg(feature = "mmap")]
    Mmap(memmap2::Mmap),
}

impl std::ops::Deref for DecodeInput {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        match self {
            DecodeInput::Buf(v) => v,
            #[cfg(feature = "mmap")]
            DecodeInput::Mmap(m) => m,
        }
    }
}

/// Laedt die Eingabedaten fuer den Decode-Pfad.
/// Datei-Input wird mit Feature `mmap` gemappt, stdin per read_to_end() gelesen.
fn load_decode_input(path: &str) -> Result<DecodeInput, String> {
    #[cfg(feature = "mmap")]
    {
        if path != "-" {
            let file = std::fs::File::open(path)
                .map_err(|e| format!("Lesefehler '{}': {e}", path))?;
            // SAFETY: die Datei wird waehrend des Decodierens nicht veraendert.
            let mmap = unsafe { memmap2::Mmap::map(&file) }
                .map_err(|e| format!("Mmap-Fehler '{}': {e}", path))?;
            return Ok(DecodeInput::Mmap(mmap));
        }
    }
    read_input(path).map(DecodeInput::Buf)
}

/// Erstellt einen BufWriter fuer stdout oder eine Datei.
fn create_buf_writer(path: &str) -> Result<std::io::BufWriter<Box<dyn Write>>, String> {
    if path == "-" {
        Ok(std::io::BufWriter::new(Box::new(std::io::stdout())))
    } else {
        let file = std::fs::File::create(path)
            .map_err(|e| format!("Schreibfehler: {e}"))?;
        Ok(std::io::BufWriter::new(Box::new(file)))
    }
}

/// Schreibt Output entweder nach stdout ("-") oder atomar in eine Datei (tmp+rename).
fn write_to_output(
    output_path: &str,
    write_fn: impl FnOnce(std::io::BufWriter<Box<dyn Write>>) -> Result<(), String>,
) -> Result<(), String> {
    if output_path == "-" {
        return write_fn(create_buf_writer("-")?);
    }

    let tmp_path = format!("{output_path}.tmp");
    let writer = create_buf_writer(&tmp_path)?;
    if let Err(e) = write_fn(writer) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, output_path)
        .map_err(|e| format!("Rename-Fehler: {e}"))
}

/// Leitet den Output-Pfad aus der Eingabe und der gewuenschten Extension ab.
///
/// Bei explizitem `-o` wird dieser Pfad direkt verwendet. Ohne `-o` wird
/// die Extension der Eingabedatei ersetzt (bzw. angehaengt wenn keine vorhanden).
fn resolve_output_path(explicit: Option<&str>, input: &str, ext: &str) -> Result<String, String> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }
    if input == "-" {
        return Err("ohne -o braucht es eine Eingabedatei (nicht stdin)".into());
    }
    let path = std::path::Path::new(input);
    let stem = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "ungueltiger Eingabepfad".to_string())?;
    let parent = path.parent().unwrap_or_else(|| std::path::Path::new(""));
    Ok(parent.join(format!("{stem}.{ext}")).to_string_lossy().to_string())
}
