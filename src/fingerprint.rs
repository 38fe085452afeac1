use sha2::{Digest, Sha256};

use crate::model::ParameterConfiguration;

const FINGERPRINT_BYTES: usize = 16;
const FIELD_SEPARATOR: &str = "|";

pub fn fingerprint(config: &ParameterConfiguration) -> String {
    let mut fields = vec![
        config.llm.clone(),
        config.embedding_model.clone(),
        config.vector_store.clone(),
        config.loader.clone(),
        config.similarity_top_k.to_string(),
        config.chunking_config.clone(),
    ];

    if let Some(git) = &config.git_data {
        fields.push(git.user.clone());
        fields.push(git.repo.clone());
        fields.push(git.branch.clone());
        for filter in git.sorted_filters() {
            fields.extend(filter.fingerprint_tokens());
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(fields.join(FIELD_SEPARATOR).as_bytes());
    let digest = hasher.finalize();

    digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilterDirection, FilterKind, GitFilter, GitSource};

    fn base_config() -> ParameterConfiguration {
        ParameterConfiguration {
            llm: "gpt-4".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            vector_store: "VectorStoreIndex".to_string(),
            loader: "SimpleDirectoryReader".to_string(),
            similarity_top_k: 3,
            chunking_config: "1024 chunk size/20 chunk overlap".to_string(),
            git_data: None,
        }
    }

    fn with_filters(filters: Vec<GitFilter>) -> ParameterConfiguration {
        ParameterConfiguration {
            git_data: Some(GitSource {
                user: "dpastling".to_string(),
                repo: "plethora".to_string(),
                branch: "master".to_string(),
                filters,
            }),
            ..base_config()
        }
    }

    #[test]
    fn fingerprint_is_fixed_length_hex() {
        let value = fingerprint(&base_config());
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(value, fingerprint(&base_config()));
    }

    #[test]
    fn fingerprint_ignores_filter_and_value_order() {
        let directory = GitFilter {
            direction: FilterDirection::Exclude,
            kind: FilterKind::Directory,
            values: vec!["logs".to_string(), "data".to_string()],
        };
        let extension = GitFilter {
            direction: FilterDirection::Include,
            kind: FilterKind::FileExtension,
            values: vec![".py".to_string(), ".R".to_string()],
        };
        let mut reversed_directory = directory.clone();
        reversed_directory.values.reverse();

        let a = with_filters(vec![directory, extension.clone()]);
        let b = with_filters(vec![extension, reversed_directory]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_changes_with_every_field() {
        let base = fingerprint(&base_config());
        let variants = vec![
            ParameterConfiguration {
                llm: "gpt-4-turbo".to_string(),
                ..base_config()
            },
            ParameterConfiguration {
                embedding_model: "text-embedding-3-large".to_string(),
                ..base_config()
            },
            ParameterConfiguration {
                vector_store: "Other".to_string(),
                ..base_config()
            },
            ParameterConfiguration {
                loader: "PDFReader".to_string(),
                ..base_config()
            },
            ParameterConfiguration {
                similarity_top_k: 4,
                ..base_config()
            },
            ParameterConfiguration {
                chunking_config: "semantic".to_string(),
                ..base_config()
            },
            with_filters(Vec::new()),
        ];

        for variant in variants {
            assert_ne!(fingerprint(&variant), base, "variant {variant:?}");
        }
    }

    #[test]
    fn fingerprint_distinguishes_branch_and_filters() {
        let plain = with_filters(Vec::new());
        let mut other_branch = plain.clone();
        if let Some(git) = other_branch.git_data.as_mut() {
            git.branch = "main".to_string();
        }
        let filtered = with_filters(vec![GitFilter::new(
            FilterDirection::Exclude,
            FilterKind::FileExtension,
            vec![".gz".to_string()],
        )]);

        assert_ne!(fingerprint(&plain), fingerprint(&other_branch));
        assert_ne!(fingerprint(&plain), fingerprint(&filtered));
    }
}
