use std::fs::File;

use anyhow::{anyhow, Context};
use log::info;

use binani::{
    cli::parse_args,
    compute_anis,
    io::{check_bins, discover_bins, read_bin_table},
    output::{read_similarities, write_matrix},
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args();

    let matrix = if let Some(path) = &args.similarities {
        info!("Loading pairwise similarities from {}", path.display());
        read_similarities(path, &args.extensions)
            .with_context(|| format!("Failed to read similarities: {}", path.display()))?
    } else {
        let config = args.to_config()?;

        let mut bins = Vec::new();
        if !args.bin_dirs.is_empty() {
            bins.extend(discover_bins(&args.bin_dirs, &config.extensions)?);
        }
        if let Some(table) = &args.bin_table {
            bins.extend(
                read_bin_table(table)
                    .with_context(|| format!("Failed to read bin table: {}", table.display()))?,
            );
        }
        if bins.is_empty() {
            return Err(anyhow!(
                "No bins given, use --bin-dirs, --bin-table or --similarities"
            ));
        }
        info!("Comparing {} bins", bins.len());

        if args.check_bins {
            check_bins(&bins, config.progress)?;
        }

        let run = compute_anis(&bins, &config)?;
        if let Some(output) = &run.output {
            info!("Raw results written to {}", output.display());
        }
        run.matrix
    };

    match &args.matrix {
        Some(path) => {
            let outfile = File::create(path)
                .with_context(|| format!("Could not create file: {:?}", path))?;
            write_matrix(outfile, &matrix)?;
            info!("Wrote {} similarities to {}", matrix.len(), path.display());
        }
        None => write_matrix(std::io::stdout().lock(), &matrix)?,
    }

    Ok(())
}
