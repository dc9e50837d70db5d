//! Tantivy-based search index module.
//!
//! Full-text search over active projects in both languages with field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Project;

/// Field boosts: titles > tags > descriptions > about > category names.
const BOOST_TITLE: f32 = 10.0;
const BOOST_TAGS: f32 = 7.0;
const BOOST_DESCRIPTION: f32 = 5.0;
const BOOST_ABOUT: f32 = 3.0;
const BOOST_CATEGORIES: f32 = 2.0;

/// Search hit with its relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub project_id: String,
    pub score: f32,
}

struct SearchFields {
    project_id: Field,
    title: Field,
    tags: Field,
    description: Field,
    about: Field,
    categories: Field,
}

/// Tantivy search index for projects.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let project_id = schema_builder.add_text_field("project_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let about = schema_builder.add_text_field("about", TEXT);
        let categories = schema_builder.add_text_field("categories", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            project_id,
            title,
            tags,
            description,
            about,
            categories,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index. Inactive projects are left out.
    pub async fn rebuild(&self, projects: &[Project]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;

        let mut indexed = 0;
        for project in projects.iter().filter(|p| p.is_active) {
            writer.add_document(self.create_document(project))?;
            indexed += 1;
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} projects", indexed);
        Ok(())
    }

    /// Index or re-index one project. An inactive project is only removed.
    pub async fn index_project(&self, project: &Project) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.project_id, &project.id));
        if project.is_active {
            writer.add_document(self.create_document(project))?;
        }
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Remove a project from the index.
    pub async fn remove_project(&self, project_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.project_id, project_id));
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Search for projects matching the query.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.tags, BOOST_TAGS),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.about, BOOST_ABOUT),
            (self.fields.categories, BOOST_CATEGORIES),
        ];

        // Lenient parsing: visitors type free text, not query syntax
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let parser = QueryParser::for_index(&self.index, vec![field]);
            let (field_query, _errors) = parser.parse_query_lenient(query_str);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }
        let combined = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&combined, &TopDocs::with_limit(limit))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let project_id = doc.get_first(self.fields.project_id)?.as_str()?.to_string();
                Some(SearchResult { project_id, score })
            })
            .collect();

        Ok(results)
    }

    fn create_document(&self, project: &Project) -> TantivyDocument {
        let categories: Vec<&str> = project
            .categories
            .iter()
            .flat_map(|c| [c.name_es.as_str(), c.name_en.as_str()])
            .collect();

        let about = [project.about_es.as_deref(), project.about_en.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        doc!(
            self.fields.project_id => project.id.clone(),
            self.fields.title => format!("{} {}", project.title_es, project.title_en),
            self.fields.tags => project.tags.join(" "),
            self.fields.description => format!("{} {}", project.description_es, project.description_en),
            self.fields.about => about,
            self.fields.categories => categories.join(" ")
        )
    }
}
