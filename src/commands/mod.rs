use crate::cli::GeneratorArgs;
use crate::domain::Domain;
use crate::generation::CommandGenerator;

pub mod evaluate;
pub mod generate;
pub mod search;
pub mod status;

fn selected_domains(requested: &[Domain]) -> Vec<Domain> {
    if requested.is_empty() {
        return Domain::ALL.to_vec();
    }
    let mut domains = Vec::with_capacity(requested.len());
    for domain in requested {
        if !domains.contains(domain) {
            domains.push(*domain);
        }
    }
    domains
}

fn command_generator(args: &GeneratorArgs) -> CommandGenerator {
    CommandGenerator::new(
        args.generator.clone(),
        args.generator_args.clone(),
        args.generator_output,
    )
}
