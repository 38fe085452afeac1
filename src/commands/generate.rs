use anyhow::{Result, bail};
use tracing::info;

use crate::cli::GenerateArgs;
use crate::fingerprint::fingerprint;
use crate::git::git_source_from_args;
use crate::options::{OptionsCatalogue, Selections};
use crate::session::{GenerationSession, SourceDocument};

use super::{command_generator, selected_domains};

pub fn run(args: GenerateArgs) -> Result<()> {
    let catalogue = OptionsCatalogue::load_or_builtin(args.generator.options_path.as_deref())?;

    let git_data = match args.github_url.as_deref() {
        Some(url) => Some(git_source_from_args(
            url,
            args.git_branch.as_deref(),
            &args.git_filters,
        )?),
        None => None,
    };

    let config = catalogue.resolve(Selections {
        llm: args.llm,
        embedding_model: args.embedding_model,
        vector_store: args.vector_store,
        loader: args.loader,
        similarity_top_k: args.similarity_top_k,
        chunking_config: args.chunking_config,
        git_data,
    })?;
    let document = SourceDocument::from_path(&args.file)?;
    for path in &args.other_docs {
        if !path.is_file() {
            bail!("auxiliary document not found: {}", path.display());
        }
    }

    let domains = selected_domains(&args.domains);
    info!(
        document = %document.filename,
        hash_str = %fingerprint(&config),
        domains = domains.len(),
        "generate requested"
    );

    let mut session = GenerationSession::new(
        document,
        args.other_docs,
        config,
        &args.generator.output_dir,
        command_generator(&args.generator),
    );

    for domain in domains {
        let result = session.perform_query(domain)?;
        let run_index = result
            .run_log
            .find(result.domain, &fingerprint(session.config()))
            .map(|entry| entry.entries.curr_index)
            .unwrap_or_default();
        info!(domain = %domain, run_index, "domain complete");
    }

    info!(
        output_root = %session.tracker().root().display(),
        "generate complete"
    );
    Ok(())
}
