//! Spicier sparse LU command-line interface.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use spicier_solver::{PivotConfig, SparseLuSolver};
use spicier_sparse::{CoordinateMatrix, read_matrix, read_vector};

#[derive(Parser)]
#[command(name = "spicier-lu")]
#[command(about = "Solve a sparse linear system with Markowitz pivoting", long_about = None)]
#[command(version)]
struct Cli {
    /// Matrix Market file holding the square matrix
    #[arg(value_name = "MATRIX")]
    matrix: PathBuf,

    /// Matrix Market file holding the right-hand side (default: all ones)
    #[arg(long, value_name = "VECTOR")]
    rhs: Option<PathBuf>,

    /// JSON file with pivot thresholds
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Relative pivot threshold
    #[arg(long)]
    pivrel: Option<f64>,

    /// Absolute pivot threshold
    #[arg(long)]
    pivtol: Option<f64>,

    /// Keep the last N rows and columns out of the pivot search
    #[arg(long, value_name = "N", default_value_t = 0)]
    reduction: usize,

    /// Move voltage-source twins onto the diagonal before ordering
    #[arg(long)]
    preorder: bool,

    /// Solve the transposed system
    #[arg(long)]
    transposed: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let matrix = load_matrix(&cli.matrix)?;
    let size = matrix.size;
    let rhs = match &cli.rhs {
        Some(path) => {
            let rhs = load_vector(path)?;
            if rhs.len() != size {
                bail!(
                    "right-hand side has {} entries, matrix is {size}x{size}",
                    rhs.len()
                );
            }
            rhs
        }
        None => vec![1.0; size],
    };

    if cli.reduction > size {
        bail!("search reduction {} exceeds matrix size {size}", cli.reduction);
    }

    let mut solver = SparseLuSolver::with_config(config)?;
    for &(row, column, value) in &matrix.entries {
        let id = solver.get_element(row, column);
        solver.add_value(id, value);
    }
    solver.set_rhs(&rhs);
    solver.set_pivot_search_reduction(cli.reduction);
    let swaps = if cli.preorder {
        solver.preorder_modified_nodal_analysis()?
    } else {
        0
    };
    solver
        .order_and_factor()
        .with_context(|| format!("Failed to factor {}", cli.matrix.display()))?;

    let mut solution = vec![0.0; size];
    if cli.transposed {
        solver.solve_transposed(&mut solution)?;
    } else {
        solver.solve(&mut solution)?;
    }

    if cli.verbose {
        println!("Matrix: {}", cli.matrix.display());
        println!("Size: {size}");
        println!("Nonzeros: {}", matrix.nnz());
        println!("Elements after factoring: {}", solver.matrix().element_count());
        println!("Fill-ins: {}", solver.fillins());
        if cli.preorder {
            println!("Preorder swaps: {swaps}");
        }
        println!(
            "Residual: {:.3e}",
            residual(&matrix, &rhs, &solution, cli.transposed)
        );
        println!();
    }

    for (k, value) in solution.iter().enumerate() {
        println!("x({}) = {:.9e}", k + 1, value);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PivotConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        }
        None => PivotConfig::default(),
    };
    if let Some(pivrel) = cli.pivrel {
        config.relative_pivot_threshold = pivrel;
    }
    if let Some(pivtol) = cli.pivtol {
        config.absolute_pivot_threshold = pivtol;
    }
    config.validate()?;
    Ok(config)
}

fn load_matrix(path: &Path) -> Result<CoordinateMatrix> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open matrix: {}", path.display()))?;
    read_matrix(BufReader::new(file))
        .with_context(|| format!("Failed to parse matrix: {}", path.display()))
}

fn load_vector(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open right-hand side: {}", path.display()))?;
    read_vector(BufReader::new(file))
        .with_context(|| format!("Failed to parse right-hand side: {}", path.display()))
}

/// Largest absolute entry of `b - A x` (or `b - Aᵀ x`).
fn residual(matrix: &CoordinateMatrix, rhs: &[f64], x: &[f64], transposed: bool) -> f64 {
    let mut r = rhs.to_vec();
    for &(row, column, value) in &matrix.entries {
        let (row, column) = if transposed { (column, row) } else { (row, column) };
        r[row - 1] -= value * x[column - 1];
    }
    r.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}
