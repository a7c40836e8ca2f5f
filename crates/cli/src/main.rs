mod logging;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rnaedit_core::constraints::{ConstraintRequest, Orientation};
use rnaedit_core::edit::{apply_edit, EditOperation, EditRequest};
use rnaedit_core::{ConstraintOptions, FrozenSet, NucleotideKey, Scene};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Kind {
    SingleNucleotide,
    SingleBasePair,
    SingleStrand,
    Helix,
    StackedHelix,
    Subdomain,
    Cycle,
    Molecule,
    Complex,
    Scene,
    Color,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OrientationArg {
    Cw,
    Ccw,
    Straight,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Cw => Orientation::Clockwise,
            OrientationArg::Ccw => Orientation::Counterclockwise,
            OrientationArg::Straight => Orientation::Straight,
        }
    }
}

/// Drag and reshape topological units of an RNA secondary structure diagram
#[derive(Parser, Debug)]
#[command(name = "rnaedit", version)]
struct Cli {
    /// Scene JSON to edit
    #[arg(long, conflicts_with = "structure", required_unless_present = "structure")]
    scene: Option<PathBuf>,

    /// Dot-bracket-plus structure notation, laid out on a circle
    #[arg(short, long)]
    structure: Option<String>,

    /// RNA sequence for --structure (e.g. GGGAAACCC)
    #[arg(short = 'q', long, requires = "structure")]
    sequence: Option<String>,

    /// Prepared edit request JSON; replaces the constraint and operation flags
    #[arg(long, conflicts_with_all = ["constraint", "key"])]
    edit: Option<PathBuf>,

    /// Topology to select
    #[arg(short, long, value_enum)]
    constraint: Option<Kind>,

    /// Clicked nucleotide as COMPLEX:MOLECULE:INDEX
    #[arg(short, long, value_parser = parse_key)]
    key: Option<NucleotideKey>,

    /// Partner of a nucleotide with several base pairs, as COMPLEX:MOLECULE:INDEX
    #[arg(long, value_parser = parse_key)]
    partner: Option<NucleotideKey>,

    /// Drag the selection by X,Y
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    drag: Option<(f64, f64)>,

    /// Rotate labels with arc and interpolation drags
    #[arg(long)]
    reposition_annotations: bool,

    /// Lay a cycle out on a circle of this radius
    #[arg(long)]
    set_radius: Option<f64>,

    /// Lay a cycle out at its natural backbone spacing
    #[arg(long)]
    normalize: bool,

    /// Reshape a single strand
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Offset of the reshaped strand along the boundary normal
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    displacement: f64,

    /// Mirror a single strand or cycle across its anchor chord
    #[arg(long)]
    flip: bool,

    /// Nucleotides that must not move, as COMPLEX:MOLECULE:INDEX
    #[arg(long, value_parser = parse_key)]
    frozen: Vec<NucleotideKey>,

    /// Leave hairpin loops behind when dragging the pair or helix closing them
    #[arg(long)]
    no_hairpin: bool,

    /// Stop single strands where the frozen status changes
    #[arg(long)]
    truncate: bool,

    /// Treat mismatch base pairs as unpaired
    #[arg(long)]
    noncanonical_unpaired: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable logging
    #[arg(long)]
    quiet: bool,
}

fn parse_key(s: &str) -> Result<NucleotideKey, String> {
    let err = || format!("expected COMPLEX:MOLECULE:INDEX, got '{s}'");
    let (complex, rest) = s.split_once(':').ok_or_else(err)?;
    let (molecule, index) = rest.rsplit_once(':').ok_or_else(err)?;
    let complex = complex.trim().parse().map_err(|_| err())?;
    let index = index.trim().parse().map_err(|_| err())?;
    if molecule.is_empty() {
        return Err(err());
    }
    Ok(NucleotideKey::new(complex, molecule, index))
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let err = || format!("expected X,Y, got '{s}'");
    let (x, y) = s.split_once(',').ok_or_else(err)?;
    let x = x.trim().parse().map_err(|_| err())?;
    let y = y.trim().parse().map_err(|_| err())?;
    Ok((x, y))
}

fn request(kind: Kind, key: NucleotideKey, partner: Option<NucleotideKey>) -> ConstraintRequest {
    match kind {
        Kind::SingleNucleotide => ConstraintRequest::SingleNucleotide { key },
        Kind::SingleBasePair => ConstraintRequest::SingleBasePair { key, partner },
        Kind::SingleStrand => ConstraintRequest::RnaSingleStrand { key },
        Kind::Helix => ConstraintRequest::RnaHelix { key, partner },
        Kind::StackedHelix => ConstraintRequest::RnaStackedHelix { key, partner },
        Kind::Subdomain => ConstraintRequest::RnaSubDomain { key, partner },
        Kind::Cycle => ConstraintRequest::RnaCycle { key },
        Kind::Molecule => ConstraintRequest::RnaMolecule { key },
        Kind::Complex => ConstraintRequest::RnaComplex { key },
        Kind::Scene => ConstraintRequest::EntireScene { key },
        Kind::Color => ConstraintRequest::SingleColor { key },
    }
}

fn load_scene(cli: &Cli) -> Result<Scene> {
    if let Some(path) = &cli.scene {
        let text = read(path)?;
        return serde_json::from_str(&text)
            .with_context(|| format!("invalid scene JSON in {}", path.display()));
    }
    let Some(structure) = &cli.structure else {
        bail!("one of --scene or --structure is required");
    };
    rnaedit_core::scene_from_dot_bracket(structure, cli.sequence.as_deref())
        .with_context(|| format!("invalid structure '{structure}'"))
}

fn edit_request(cli: &Cli) -> Result<EditRequest> {
    if let Some(path) = &cli.edit {
        let text = read(path)?;
        return serde_json::from_str(&text)
            .with_context(|| format!("invalid edit request in {}", path.display()));
    }
    let (Some(kind), Some(key)) = (cli.constraint, cli.key.clone()) else {
        bail!("--constraint and --key are required unless --edit is given");
    };

    let mut operations = Vec::new();
    if let Some((x, y)) = cli.drag {
        operations.push(EditOperation::Drag {
            x,
            y,
            reposition_annotations: cli.reposition_annotations,
        });
    }
    if let Some(radius) = cli.set_radius {
        operations.push(EditOperation::SetRadius { radius });
    }
    if cli.normalize {
        operations.push(EditOperation::Normalize);
    }
    if let Some(orientation) = cli.orientation {
        operations.push(EditOperation::SetOrientation {
            orientation: orientation.into(),
            displacement_along_normal: cli.displacement,
        });
    }
    if cli.flip {
        operations.push(EditOperation::Flip);
    }

    Ok(EditRequest {
        constraint: request(kind, key, cli.partner.clone()),
        options: ConstraintOptions {
            affect_hairpin_nucleotides: !cli.no_hairpin,
            truncate_rna_single_strand_flag: cli.truncate,
            treat_noncanonical_base_pairs_as_unpaired: cli.noncanonical_unpaired,
        },
        frozen: cli.frozen.iter().cloned().collect::<FrozenSet>(),
        operations,
    })
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn run(cli: &Cli) -> Result<String> {
    let mut scene = load_scene(cli)?;
    let request = edit_request(cli)?;
    debug!(?request, "edit request");

    let outcome = apply_edit(&mut scene, &request)
        .with_context(|| format!("{} constraint failed", request.constraint.kind()))?;
    info!(
        members = outcome.member_keys.len(),
        moved = outcome.batch.nucleotides.len(),
        "edit applied"
    );

    let document = serde_json::json!({ "scene": scene, "outcome": outcome });
    serde_json::to_string_pretty(&document).context("failed to encode output")
}

fn main() {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet);

    let output = match run(&cli) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    };

    if let Some(path) = cli.output {
        if let Err(e) = std::fs::write(&path, &output) {
            eprintln!("error: failed to write {}: {e}", path.display());
            process::exit(1);
        }
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = handle.write_all(output.as_bytes()) {
            eprintln!("error: write failed: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(
            parse_key("0:strand1:4").unwrap(),
            NucleotideKey::new(0, "strand1", 4)
        );
        assert_eq!(
            parse_key("2:a:b:-1").unwrap(),
            NucleotideKey::new(2, "a:b", -1)
        );
        assert!(parse_key("strand0:4").is_err());
        assert!(parse_key("0::4").is_err());
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.5,-2").unwrap(), (1.5, -2.0));
        assert!(parse_point("1.5").is_err());
    }

    #[test]
    fn test_flags_become_operations() {
        let cli = Cli::parse_from([
            "rnaedit",
            "--structure",
            "((....))",
            "--constraint",
            "cycle",
            "--key",
            "0:strand0:3",
            "--set-radius",
            "4",
            "--flip",
            "--no-hairpin",
        ]);
        let request = edit_request(&cli).unwrap();
        assert_eq!(
            request.operations,
            vec![EditOperation::SetRadius { radius: 4.0 }, EditOperation::Flip]
        );
        assert!(!request.options.affect_hairpin_nucleotides);

        let output = run(&cli).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["outcome"]["kind"], "rna_cycle");
    }
}
