//! Tantivy-based booking search for the admin dashboard.
//!
//! Dispatchers look bookings up by whatever the customer tells them on the phone:
//! a name, an email, a phone number, an address or a flight number.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Booking;

/// Field boost values.
const BOOST_NAME: f32 = 10.0;
const BOOST_EMAIL: f32 = 9.0;
const BOOST_PHONE: f32 = 8.0;
const BOOST_FLIGHT: f32 = 6.0;
const BOOST_LOCATIONS: f32 = 4.0;
const BOOST_NOTES: f32 = 2.0;

/// Search result with booking ID and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub booking_id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    booking_id: Field,
    name: Field,
    email: Field,
    phone: Field,
    locations: Field,
    flight_number: Field,
    notes: Field,
}

/// Tantivy search index for bookings.
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
        let booking_id = schema_builder.add_text_field("booking_id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT);
        let email = schema_builder.add_text_field("email", TEXT);
        let phone = schema_builder.add_text_field("phone", TEXT);
        let locations = schema_builder.add_text_field("locations", TEXT);
        let flight_number = schema_builder.add_text_field("flight_number", TEXT);
        let notes = schema_builder.add_text_field("notes", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            booking_id,
            name,
            email,
            phone,
            locations,
            flight_number,
            notes,
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

    /// Rebuild the entire index from bookings.
    pub async fn rebuild(&self, bookings: &[Booking]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for booking in bookings {
            writer.add_document(self.create_document(booking))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} bookings", bookings.len());
        Ok(())
    }

    /// Index (or re-index) a single booking.
    pub async fn index_booking(&self, booking: &Booking) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.booking_id, &booking.id);
        writer.delete_term(term);
        writer.add_document(self.create_document(booking))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for bookings matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.name, BOOST_NAME),
            (self.fields.email, BOOST_EMAIL),
            (self.fields.phone, BOOST_PHONE),
            (self.fields.flight_number, BOOST_FLIGHT),
            (self.fields.locations, BOOST_LOCATIONS),
            (self.fields.notes, BOOST_NOTES),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let mut field_parser = QueryParser::for_index(&self.index, vec![field]);
            field_parser.set_conjunction_by_default();
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        if subqueries.is_empty() {
            return Err(AppError::Search(format!(
                "Invalid search query: {}",
                query_str
            )));
        }
        let combined_query = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit.saturating_add(offset)))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results: Vec<SearchResult> = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let booking_id = doc.get_first(self.fields.booking_id)?.as_str()?.to_string();
                Some(SearchResult { booking_id, score })
            })
            .collect();

        Ok(results)
    }

    fn create_document(&self, booking: &Booking) -> TantivyDocument {
        doc!(
            self.fields.booking_id => booking.id.clone(),
            self.fields.name => booking.name.clone(),
            self.fields.email => booking.email.clone(),
            self.fields.phone => phone_tokens(&booking.phone),
            self.fields.locations => format!("{} {}", booking.pickup_location, booking.dropoff_location),
            self.fields.flight_number => booking.flight_number.clone().unwrap_or_default(),
            self.fields.notes => booking.notes.clone().unwrap_or_default()
        )
    }
}

/// Index a phone number both as written and as bare digits, so "555-0101" and "5550101" both hit.
fn phone_tokens(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("{} {}", phone, digits)
}
