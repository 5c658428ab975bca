//! JSON shapes exchanged with clients and their mapping onto entities
//!
//! Missing fields deserialize to empty or zero values so that they are
//! reported by validation rather than rejected by the JSON extractor.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::model::{Author, Book, Category, NewAuthor, NewBook, NewCategory, Price};
use crate::repository::{CatalogEntity, PaginatedList};

use super::error::{ApiError, ApiOperation};
use super::validation::Validator;

/// Converts between an entity and its wire representation
pub trait WireEntity: CatalogEntity {
    /// Representation returned to clients
    type Dto: Serialize + Send + 'static;
    /// Body accepted by POST
    type CreateDto: DeserializeOwned + Send + 'static;
    /// Body accepted by PUT, carrying the target `id`
    type UpdateDto: DeserializeOwned + Send + 'static;

    fn to_dto(self) -> Self::Dto;

    /// Validate a create body into a draft
    fn draft_from(dto: Self::CreateDto) -> Result<Self::Draft, ApiError>;

    /// Validate an update body into the full new state
    fn entity_from(dto: Self::UpdateDto) -> Result<Self, ApiError>;
}

/// Author or category as sent over the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamedDto {
    pub id: i64,
    pub name: String,
}

/// Create body for authors and categories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateNamedDto {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookDto {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub author_id: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBookDto {
    pub title: String,
    pub price: f64,
    pub author_id: i64,
    pub category_id: i64,
}

/// One page of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Convert a repository page into its wire form
    pub fn from_list<E: WireEntity<Dto = T>>(list: PaginatedList<E>) -> Self {
        let list = list.map(E::to_dto);
        Self {
            items: list.items,
            page: list.page,
            total_pages: list.total_pages,
        }
    }
}

fn validate_name(name: &str, operation: ApiOperation) -> Result<String, ApiError> {
    let mut v = Validator::new();
    v.text("name", "Name", name);
    v.finish(operation, name.to_string())
}

fn validate_named(dto: NamedDto) -> Result<(i64, String), ApiError> {
    let mut v = Validator::new();
    v.id("id", "id", dto.id);
    v.text("name", "Name", &dto.name);
    v.finish(ApiOperation::Update, (dto.id, dto.name))
}

impl WireEntity for Author {
    type Dto = NamedDto;
    type CreateDto = CreateNamedDto;
    type UpdateDto = NamedDto;

    fn to_dto(self) -> NamedDto {
        NamedDto {
            id: self.id,
            name: self.name,
        }
    }

    fn draft_from(dto: CreateNamedDto) -> Result<NewAuthor, ApiError> {
        let name = validate_name(&dto.name, ApiOperation::Create)?;
        Ok(NewAuthor { name })
    }

    fn entity_from(dto: NamedDto) -> Result<Self, ApiError> {
        let (id, name) = validate_named(dto)?;
        Ok(Author { id, name })
    }
}

impl WireEntity for Category {
    type Dto = NamedDto;
    type CreateDto = CreateNamedDto;
    type UpdateDto = NamedDto;

    fn to_dto(self) -> NamedDto {
        NamedDto {
            id: self.id,
            name: self.name,
        }
    }

    fn draft_from(dto: CreateNamedDto) -> Result<NewCategory, ApiError> {
        let name = validate_name(&dto.name, ApiOperation::Create)?;
        Ok(NewCategory { name })
    }

    fn entity_from(dto: NamedDto) -> Result<Self, ApiError> {
        let (id, name) = validate_named(dto)?;
        Ok(Category { id, name })
    }
}

/// Shared book rules; `price` must be a positive whole number of cents
fn validate_book(
    v: &mut Validator,
    title: &str,
    price: f64,
    author_id: i64,
    category_id: i64,
) -> Price {
    v.text("title", "Title", title);
    let price = Price::from_decimal(price).filter(|p| p.is_positive());
    if price.is_none() {
        v.add("price", "INVALID_PRICE", "Invalid Price");
    }
    v.id("authorId", "author id", author_id);
    v.id("categoryId", "category id", category_id);
    price.unwrap_or_default()
}

impl WireEntity for Book {
    type Dto = BookDto;
    type CreateDto = CreateBookDto;
    type UpdateDto = BookDto;

    fn to_dto(self) -> BookDto {
        BookDto {
            id: self.id,
            title: self.title,
            price: self.price.as_decimal(),
            author_id: self.author_id,
            category_id: self.category_id,
        }
    }

    fn draft_from(dto: CreateBookDto) -> Result<NewBook, ApiError> {
        let mut v = Validator::new();
        let price = validate_book(&mut v, &dto.title, dto.price, dto.author_id, dto.category_id);
        v.finish(
            ApiOperation::Create,
            NewBook {
                title: dto.title,
                price,
                author_id: dto.author_id,
                category_id: dto.category_id,
            },
        )
    }

    fn entity_from(dto: BookDto) -> Result<Self, ApiError> {
        let mut v = Validator::new();
        v.id("id", "id", dto.id);
        let price = validate_book(&mut v, &dto.title, dto.price, dto.author_id, dto.category_id);
        v.finish(
            ApiOperation::Update,
            Book {
                id: dto.id,
                title: dto.title,
                price,
                author_id: dto.author_id,
                category_id: dto.category_id,
            },
        )
    }
}
