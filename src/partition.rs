use std::{collections::BTreeSet, path::Path};

use serde::Serialize;
use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    Term,
    collector::TopDocs,
    doc,
    query::{BooleanQuery, Occur, Query, QueryParser, TermQuery},
    schema::*,
    snippet::SnippetGenerator,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::error::{Error, Result};

/// Language code carried by pages without explicit language metadata.
pub const DEFAULT_LANGUAGE: &str = "default";

/// Maximum excerpt length in characters.
const EXCERPT_MAX_CHARS: usize = 160;

/// Field names used in the schema.
pub mod fields {
    pub const PAGE_REF: &str = "page_ref";
    pub const PAGE_ID: &str = "page_id";
    pub const PATH: &str = "path";
    pub const LANGUAGE: &str = "language";
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
    pub const MTIME: &str = "mtime";
}

/// Restricts a search to a set of ISO-2 language codes.
///
/// The sentinel code [`DEFAULT_LANGUAGE`] selects pages indexed without
/// language metadata. An empty filter applies no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageFilter {
    codes: BTreeSet<String>,
}

impl LanguageFilter {
    /// A filter matching all languages.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(Into::into)
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }
}

/// A scored hit from one partition.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub page_ref: String,
    pub page_id: u64,
    pub partition: String,
    pub path: String,
    pub title: String,
    pub language: String,
    pub score: f32,
    pub excerpt: String,
}

/// One independently searchable tantivy index (a single wiki partition).
pub struct PartitionIndex {
    name: String,
    index: Index,
    reader: IndexReader,
    schema: Schema,
}

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
pub struct SchemaFields {
    pub page_ref: Field,
    pub page_id: Field,
    pub path: Field,
    pub language: Field,
    pub title: Field,
    pub body: Field,
    pub mtime: Field,
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(fields::PAGE_REF, STRING | STORED);
    builder.add_u64_field(fields::PAGE_ID, STORED | FAST);
    builder.add_text_field(fields::PATH, STRING | STORED);
    builder.add_text_field(fields::LANGUAGE, STRING | STORED | FAST);

    let title_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    builder.add_text_field(fields::TITLE, title_opts);

    // Body is stored so excerpts can be generated from hits.
    let body_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    builder.add_text_field(fields::BODY, body_opts);

    builder.add_u64_field(fields::MTIME, STORED | FAST);

    builder.build()
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

impl PartitionIndex {
    /// Open or create the index for the named partition at the given
    /// directory.
    pub fn open(name: &str, dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let schema = build_schema();

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            Index::create(
                mmap_dir,
                schema.clone(),
                tantivy::IndexSettings::default(),
            )?
        };

        register_tokenizers(&index);
        let reader = index.reader()?;

        Ok(Self {
            name: name.to_string(),
            index,
            reader,
            schema,
        })
    }

    /// Create an in-memory partition index (for testing).
    pub fn open_in_ram(name: &str) -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_tokenizers(&index);
        let reader = index.reader()?;

        Ok(Self {
            name: name.to_string(),
            index,
            reader,
            schema,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the resolved field handles.
    pub fn fields(&self) -> SchemaFields {
        let f = |name: &str| self.schema.get_field(name).unwrap();
        SchemaFields {
            page_ref: f(fields::PAGE_REF),
            page_id: f(fields::PAGE_ID),
            path: f(fields::PATH),
            language: f(fields::LANGUAGE),
            title: f(fields::TITLE),
            body: f(fields::BODY),
            mtime: f(fields::MTIME),
        }
    }

    /// Create a writer with the given memory budget (in bytes).
    pub fn writer(&self, memory_budget: usize) -> Result<IndexWriter> {
        Ok(self.index.writer(memory_budget)?)
    }

    /// Add a page to the index via the given writer, replacing any
    /// existing page with the same ref.
    #[allow(clippy::too_many_arguments)]
    pub fn add_page(
        &self,
        writer: &IndexWriter,
        page_ref: &str,
        page_id: u64,
        path: &str,
        language: &str,
        title: &str,
        body: &str,
        mtime: u64,
    ) -> Result<()> {
        let f = self.fields();

        let term = Term::from_field_text(f.page_ref, page_ref);
        writer.delete_term(term);

        writer.add_document(doc!(
            f.page_ref => page_ref,
            f.page_id => page_id,
            f.path => path,
            f.language => language,
            f.title => title,
            f.body => body,
            f.mtime => mtime,
        ))?;

        Ok(())
    }

    /// Delete every page in this partition.
    pub fn clear(&self, writer: &mut IndexWriter) -> Result<()> {
        writer.delete_all_documents()?;
        Ok(())
    }

    /// Number of committed pages visible to searches.
    pub fn doc_count(&self) -> Result<u64> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs())
    }

    /// Search this partition with BM25 scoring.
    ///
    /// Returns up to `limit` hits sorted by descending score, each with
    /// an excerpt of the matching body text. A malformed query surfaces
    /// as [`Error::QuerySyntax`]; the `title` field is boosted 2x.
    pub fn search(
        &self,
        query_str: &str,
        languages: &LanguageFilter,
        limit: usize,
    ) -> Result<Vec<Hit>> {
        let f = self.fields();
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let mut parser =
            QueryParser::for_index(&self.index, vec![f.title, f.body]);
        parser.set_field_boost(f.title, 2.0);

        let user_query = parser
            .parse_query(query_str)
            .map_err(|e| Error::QuerySyntax(e.to_string()))?;

        let query: Box<dyn Query> = if languages.is_unrestricted() {
            user_query
        } else {
            let lang_clauses: Vec<(Occur, Box<dyn Query>)> = languages
                .codes()
                .map(|code| {
                    let term = Term::from_field_text(f.language, code);
                    let tq = TermQuery::new(term, IndexRecordOption::Basic);
                    (Occur::Should, Box::new(tq) as Box<dyn Query>)
                })
                .collect();
            Box::new(BooleanQuery::new(vec![
                (Occur::Must, user_query),
                (Occur::Must, Box::new(BooleanQuery::new(lang_clauses))),
            ]))
        };

        let mut snippets = SnippetGenerator::create(&searcher, &*query, f.body)?;
        snippets.set_max_num_chars(EXCERPT_MAX_CHARS);

        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let excerpt =
                snippets.snippet_from_doc(&doc).fragment().to_string();
            hits.push(Hit {
                page_ref: extract_text(&doc, f.page_ref),
                page_id: extract_u64(&doc, f.page_id),
                partition: self.name.clone(),
                path: extract_text(&doc, f.path),
                title: extract_text(&doc, f.title),
                language: extract_text(&doc, f.language),
                score,
                excerpt,
            });
        }

        Ok(hits)
    }
}

impl std::fmt::Debug for PartitionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionIndex")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn extract_u64(doc: &TantivyDocument, field: Field) -> u64 {
    doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(
        idx: &PartitionIndex,
        writer: &IndexWriter,
        page_ref: &str,
        page_id: u64,
        path: &str,
        language: &str,
        title: &str,
        body: &str,
    ) {
        idx.add_page(
            writer, page_ref, page_id, path, language, title, body, 1000,
        )
        .unwrap();
    }

    #[test]
    fn create_and_search() {
        let idx = PartitionIndex::open_in_ram("wiki-en").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(
            &idx,
            &writer,
            "Main.Alpha",
            1,
            "Main/WebHome.md",
            "en",
            "Hello World",
            "This page greets the whole world with a hello",
        );
        add(
            &idx,
            &writer,
            "Main.Beta",
            2,
            "Dev/Rust.md",
            "en",
            "Rust Notes",
            "Rust is a systems programming language",
        );

        writer.commit().unwrap();

        let hits = idx
            .search("hello world", &LanguageFilter::any(), 10)
            .unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].page_ref, "Main.Alpha");
        assert_eq!(hits[0].partition, "wiki-en");
        assert_eq!(hits[0].language, "en");
    }

    #[test]
    fn language_filter_restricts() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(&idx, &writer, "Main.A", 1, "a.md", "en", "Tea", "tea is a drink");
        add(&idx, &writer, "Main.B", 2, "b.fr.md", "fr", "Tea", "tea au lait");
        writer.commit().unwrap();

        let all = idx.search("tea", &LanguageFilter::any(), 10).unwrap();
        assert_eq!(all.len(), 2);

        let fr_only = idx
            .search("tea", &LanguageFilter::from_codes(["fr"]), 10)
            .unwrap();
        assert_eq!(fr_only.len(), 1);
        assert_eq!(fr_only[0].language, "fr");
    }

    #[test]
    fn default_language_sentinel() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(
            &idx,
            &writer,
            "Main.A",
            1,
            "a.md",
            DEFAULT_LANGUAGE,
            "Untagged",
            "page without language metadata",
        );
        add(&idx, &writer, "Main.B", 2, "b.de.md", "de", "Tagged", "page auf deutsch");
        writer.commit().unwrap();

        let untagged = idx
            .search("page", &LanguageFilter::from_codes([DEFAULT_LANGUAGE]), 10)
            .unwrap();
        assert_eq!(untagged.len(), 1);
        assert_eq!(untagged[0].page_ref, "Main.A");
    }

    #[test]
    fn malformed_query_surfaces_syntax_error() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let err = idx
            .search("title:\"unclosed", &LanguageFilter::any(), 10)
            .unwrap_err();
        assert!(matches!(err, Error::QuerySyntax(_)));
    }

    #[test]
    fn excerpt_comes_from_body() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(
            &idx,
            &writer,
            "Main.A",
            1,
            "a.md",
            "en",
            "Gardening",
            "Water your ferns regularly and keep them out of direct sun",
        );
        writer.commit().unwrap();

        let hits = idx.search("ferns", &LanguageFilter::any(), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].excerpt.contains("ferns"));
    }

    #[test]
    fn add_page_replaces_existing_ref() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(&idx, &writer, "Main.A", 1, "a.md", "en", "Old", "old content here");
        writer.commit().unwrap();

        add(&idx, &writer, "Main.A", 1, "a.md", "en", "New", "new content here");
        writer.commit().unwrap();

        let hits = idx.search("content", &LanguageFilter::any(), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "New");
    }

    #[test]
    fn clear_removes_everything() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(&idx, &writer, "Main.A", 1, "a.md", "en", "A", "hello");
        add(&idx, &writer, "Main.B", 2, "b.md", "en", "B", "hello");
        writer.commit().unwrap();
        assert_eq!(idx.doc_count().unwrap(), 2);

        idx.clear(&mut writer).unwrap();
        writer.commit().unwrap();
        assert_eq!(idx.doc_count().unwrap(), 0);
    }

    #[test]
    fn title_boost() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(
            &idx,
            &writer,
            "Main.A",
            1,
            "a.md",
            "en",
            "Rust Guide",
            "programming language guide",
        );
        add(
            &idx,
            &writer,
            "Main.B",
            2,
            "b.md",
            "en",
            "Language Guide",
            "rust is a programming language",
        );
        writer.commit().unwrap();

        let hits = idx.search("rust", &LanguageFilter::any(), 10).unwrap();
        assert_eq!(hits.len(), 2);
        // Title match should score higher due to 2x boost.
        assert_eq!(hits[0].page_ref, "Main.A");
    }

    #[test]
    fn stemming_works() {
        let idx = PartitionIndex::open_in_ram("wiki").unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();

        add(
            &idx,
            &writer,
            "Main.A",
            1,
            "a.md",
            "en",
            "Running",
            "the runners were running quickly",
        );
        writer.commit().unwrap();

        let hits = idx.search("run", &LanguageFilter::any(), 10).unwrap();
        assert!(!hits.is_empty());
    }

    #[test]
    fn disk_persistence() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("wiki-en");

        {
            let idx = PartitionIndex::open("wiki-en", &dir).unwrap();
            let mut writer = idx.writer(15_000_000).unwrap();
            add(
                &idx,
                &writer,
                "Main.A",
                1,
                "a.md",
                "en",
                "Test",
                "persistent data",
            );
            writer.commit().unwrap();
        }

        {
            let idx = PartitionIndex::open("wiki-en", &dir).unwrap();
            let hits =
                idx.search("persistent", &LanguageFilter::any(), 10).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].page_ref, "Main.A");
        }
    }
}
