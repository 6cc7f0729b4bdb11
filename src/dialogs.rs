//! Create/update/delete dialogs for categories, feeds and the user account.
//!
//! A [`DialogRequest`] names what to edit. [`Dialog`] holds the form while it
//! is open (field values, focus, category picker, inline error). Submitting
//! validates the form into a [`Submission`], which is exactly one API call.
use crate::api::{
    ApiError, Backend, Category, CategoryForm, CategoryId, Feed, FeedId, FeedUpdate, NewFeed,
    UserForm,
};
use crate::util::validate_feed_url;
use thiserror::Error;

/// Message shown in the dialog when the API call fails.
pub const SAVE_FAILED: &str = "Something went wrong";

const MIN_TITLE_LEN: usize = 3;
const MAX_FIELD_LEN: usize = 255;

/// What the user asked to edit.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogRequest {
    CreateCategory,
    EditCategory(Category),
    DeleteCategory(Category),
    /// New feed, optionally pre-assigned to a category.
    CreateFeed { category: Option<CategoryId> },
    UpdateFeed(Feed),
    DeleteFeed(Feed),
    EditUser { name: String, email: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    #[error("Title must be between 3 and 255 characters")]
    TitleLength,
    #[error("Feed URL is required")]
    MissingFeedUrl,
    #[error("Invalid feed URL: {0}")]
    InvalidFeedUrl(String),
    #[error("{0} is too long (max 255 characters)")]
    TooLong(&'static str),
    #[error("Choose a category")]
    MissingCategory,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Name is required")]
    MissingName,
}

/// A validated dialog result: one API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    CreateCategory(CategoryForm),
    UpdateCategory(CategoryId, CategoryForm),
    DeleteCategory(CategoryId),
    CreateFeed(NewFeed),
    UpdateFeed(FeedId, FeedUpdate),
    DeleteFeed(FeedId),
    UpdateUser(UserForm),
}

/// Entity removed by a successful delete submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    Category(CategoryId),
    Feed(FeedId),
}

impl Submission {
    pub async fn execute<B: Backend + ?Sized>(&self, backend: &B) -> Result<(), ApiError> {
        match self {
            Submission::CreateCategory(form) => backend.create_category(form).await,
            Submission::UpdateCategory(id, form) => backend.update_category(*id, form).await,
            Submission::DeleteCategory(id) => backend.delete_category(*id).await,
            Submission::CreateFeed(form) => backend.create_feed(form).await,
            Submission::UpdateFeed(id, form) => backend.update_feed(*id, form).await,
            Submission::DeleteFeed(id) => backend.delete_feed(*id).await,
            Submission::UpdateUser(form) => backend.update_user(form).await,
        }
    }

    pub fn deleted(&self) -> Option<Deleted> {
        match self {
            Submission::DeleteCategory(id) => Some(Deleted::Category(*id)),
            Submission::DeleteFeed(id) => Some(Deleted::Feed(*id)),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Submission::CreateCategory(_) => "Category created",
            Submission::UpdateCategory(..) => "Category updated",
            Submission::DeleteCategory(_) => "Category deleted",
            Submission::CreateFeed(_) => "Feed added",
            Submission::UpdateFeed(..) => "Feed updated",
            Submission::DeleteFeed(_) => "Feed deleted",
            Submission::UpdateUser(_) => "Account updated",
        }
    }
}

/// One editable text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    /// Rendered masked.
    pub secret: bool,
}

impl Field {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            secret: false,
        }
    }

    fn secret(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            secret: true,
        }
    }
}

/// Open dialog state.
#[derive(Debug, Clone)]
pub struct Dialog {
    request: DialogRequest,
    fields: Vec<Field>,
    /// Index into `fields`; `fields.len()` is the category picker.
    focus: usize,
    category: Option<CategoryId>,
    error: Option<String>,
    pending: bool,
}

impl Dialog {
    pub fn open(request: DialogRequest) -> Self {
        let (fields, category) = match &request {
            DialogRequest::CreateCategory => (vec![Field::new("Title", "")], None),
            DialogRequest::EditCategory(c) => (vec![Field::new("Title", c.title.clone())], None),
            DialogRequest::CreateFeed { category } => {
                (vec![Field::new("Feed URL", "")], *category)
            }
            DialogRequest::UpdateFeed(f) => (
                vec![
                    Field::new("Title", f.feed_title.clone()),
                    Field::new("Feed URL", f.feed_url.clone()),
                    Field::new("Favicon URL", f.site_favicon_url.clone().unwrap_or_default()),
                ],
                Some(f.category_id),
            ),
            DialogRequest::EditUser { name, email } => (
                vec![
                    Field::new("Name", name.clone()),
                    Field::new("Email", email.clone()),
                    Field::secret("New password"),
                ],
                None,
            ),
            DialogRequest::DeleteCategory(_) | DialogRequest::DeleteFeed(_) => (Vec::new(), None),
        };

        Self {
            request,
            fields,
            focus: 0,
            category,
            error: None,
            pending: false,
        }
    }

    pub fn request(&self) -> &DialogRequest {
        &self.request
    }

    pub fn title(&self) -> String {
        match &self.request {
            DialogRequest::CreateCategory => "New category".to_string(),
            DialogRequest::EditCategory(c) => format!("Edit category \"{}\"", c.title),
            DialogRequest::DeleteCategory(_) => "Delete category".to_string(),
            DialogRequest::CreateFeed { .. } => "Add feed".to_string(),
            DialogRequest::UpdateFeed(f) => format!("Edit feed \"{}\"", f.feed_title),
            DialogRequest::DeleteFeed(_) => "Delete feed".to_string(),
            DialogRequest::EditUser { .. } => "Account".to_string(),
        }
    }

    /// Question shown by delete dialogs.
    pub fn confirmation(&self) -> Option<String> {
        match &self.request {
            DialogRequest::DeleteCategory(c) => Some(format!(
                "Delete category \"{}\" and its {} feed(s)?",
                c.title,
                c.feeds.len()
            )),
            DialogRequest::DeleteFeed(f) => Some(format!("Delete feed \"{}\"?", f.feed_title)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn has_category_picker(&self) -> bool {
        matches!(
            self.request,
            DialogRequest::CreateFeed { .. } | DialogRequest::UpdateFeed(_)
        )
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn picker_focused(&self) -> bool {
        self.has_category_picker() && self.focus == self.fields.len()
    }

    fn focus_slots(&self) -> usize {
        self.fields.len() + usize::from(self.has_category_picker())
    }

    pub fn focus_next(&mut self) {
        let slots = self.focus_slots();
        if slots > 0 {
            self.focus = (self.focus + 1) % slots;
        }
    }

    pub fn focus_prev(&mut self) {
        let slots = self.focus_slots();
        if slots > 0 {
            self.focus = (self.focus + slots - 1) % slots;
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if !c.is_control() {
                field.value.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    /// Step the category picker through `categories` (wrapping).
    pub fn cycle_category(&mut self, categories: &[Category], delta: isize) {
        if categories.is_empty() {
            return;
        }
        let len = categories.len() as isize;
        let current = self
            .category
            .and_then(|id| categories.iter().position(|c| c.id == id));
        let next = match current {
            Some(idx) => (idx as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        self.category = Some(categories[next as usize].id);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn set_pending(&mut self) {
        self.error = None;
        self.pending = true;
    }

    fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.trim())
            .unwrap_or("")
    }

    /// Validate the form into the single call it stands for.
    pub fn submission(&self) -> Result<Submission, DialogError> {
        match &self.request {
            DialogRequest::CreateCategory => {
                Ok(Submission::CreateCategory(category_form(self.value("Title"))?))
            }
            DialogRequest::EditCategory(c) => Ok(Submission::UpdateCategory(
                c.id,
                category_form(self.value("Title"))?,
            )),
            DialogRequest::DeleteCategory(c) => Ok(Submission::DeleteCategory(c.id)),
            DialogRequest::CreateFeed { .. } => Ok(Submission::CreateFeed(NewFeed {
                feed_url: feed_url(self.value("Feed URL"))?,
                category: self.category.ok_or(DialogError::MissingCategory)?,
            })),
            DialogRequest::UpdateFeed(f) => {
                let title = self.value("Title");
                if title.chars().count() > MAX_FIELD_LEN {
                    return Err(DialogError::TooLong("Title"));
                }
                let favicon = self.value("Favicon URL");
                if favicon.chars().count() > MAX_FIELD_LEN {
                    return Err(DialogError::TooLong("Favicon URL"));
                }
                let mut update = FeedUpdate::from_feed(f);
                update.feed_title = title.to_string();
                update.feed_url = feed_url(self.value("Feed URL"))?;
                update.site_favicon_url = (!favicon.is_empty()).then(|| favicon.to_string());
                update.category = self.category.ok_or(DialogError::MissingCategory)?;
                Ok(Submission::UpdateFeed(f.id, update))
            }
            DialogRequest::DeleteFeed(f) => Ok(Submission::DeleteFeed(f.id)),
            DialogRequest::EditUser { .. } => {
                if self.value("Name").is_empty() {
                    return Err(DialogError::MissingName);
                }
                let email = self.value("Email");
                if !email.is_empty() && !email.contains('@') {
                    return Err(DialogError::InvalidEmail);
                }
                // Passwords are sent as typed, surrounding spaces included.
                let password = self
                    .fields
                    .iter()
                    .find(|f| f.secret)
                    .map(|f| f.value.clone())
                    .unwrap_or_default();
                Ok(Submission::UpdateUser(UserForm {
                    name: self.value("Name").to_string(),
                    email: email.to_string(),
                    password,
                }))
            }
        }
    }
}

fn category_form(title: &str) -> Result<CategoryForm, DialogError> {
    let len = title.chars().count();
    if !(MIN_TITLE_LEN..=MAX_FIELD_LEN).contains(&len) {
        return Err(DialogError::TitleLength);
    }
    Ok(CategoryForm {
        title: title.to_string(),
    })
}

fn feed_url(raw: &str) -> Result<String, DialogError> {
    if raw.is_empty() {
        return Err(DialogError::MissingFeedUrl);
    }
    if raw.chars().count() > MAX_FIELD_LEN {
        return Err(DialogError::TooLong("Feed URL"));
    }
    validate_feed_url(raw)
        .map(|_| raw.to_string())
        .map_err(|e| DialogError::InvalidFeedUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{feed, tech_categories};
    use pretty_assertions::assert_eq;

    fn type_text(dialog: &mut Dialog, text: &str) {
        for c in text.chars() {
            dialog.insert_char(c);
        }
    }

    #[test]
    fn test_create_category_sends_title() {
        let mut dialog = Dialog::open(DialogRequest::CreateCategory);
        type_text(&mut dialog, "  News ");
        assert_eq!(
            dialog.submission().unwrap(),
            Submission::CreateCategory(CategoryForm {
                title: "News".to_string()
            })
        );
    }

    #[test]
    fn test_category_title_length_validated() {
        let mut dialog = Dialog::open(DialogRequest::CreateCategory);
        type_text(&mut dialog, "ab");
        assert_eq!(dialog.submission(), Err(DialogError::TitleLength));
    }

    #[test]
    fn test_edit_category_prefills_and_updates() {
        let category = tech_categories().remove(0);
        let mut dialog = Dialog::open(DialogRequest::EditCategory(category));
        assert_eq!(dialog.fields()[0].value, "Tech");
        dialog.backspace();
        type_text(&mut dialog, "nology");
        assert_eq!(
            dialog.submission().unwrap(),
            Submission::UpdateCategory(
                1,
                CategoryForm {
                    title: "Technology".to_string()
                }
            )
        );
    }

    #[test]
    fn test_create_feed_requires_category() {
        let mut dialog = Dialog::open(DialogRequest::CreateFeed { category: None });
        type_text(&mut dialog, "https://example.com/rss");
        assert_eq!(dialog.submission(), Err(DialogError::MissingCategory));

        dialog.cycle_category(&tech_categories(), 1);
        assert_eq!(
            dialog.submission().unwrap(),
            Submission::CreateFeed(NewFeed {
                feed_url: "https://example.com/rss".to_string(),
                category: 1,
            })
        );
    }

    #[test]
    fn test_create_feed_rejects_bad_url() {
        let mut dialog = Dialog::open(DialogRequest::CreateFeed { category: Some(1) });
        assert_eq!(dialog.submission(), Err(DialogError::MissingFeedUrl));
        type_text(&mut dialog, "ftp://example.com/rss");
        assert!(matches!(
            dialog.submission(),
            Err(DialogError::InvalidFeedUrl(_))
        ));
    }

    #[test]
    fn test_update_feed_keeps_unedited_fields() {
        let mut original = feed(10, "Example Feed", 1, 5);
        original.site_url = Some("https://example.com".to_string());
        original.new_entries = true;
        let mut dialog = Dialog::open(DialogRequest::UpdateFeed(original));

        let categories = vec![
            tech_categories().remove(0),
            Category {
                id: 2,
                title: "News".to_string(),
                feeds: Vec::new(),
            },
        ];
        dialog.cycle_category(&categories, 1);

        let Submission::UpdateFeed(id, update) = dialog.submission().unwrap() else {
            panic!("expected feed update");
        };
        assert_eq!(id, 10);
        assert_eq!(update.category, 2);
        assert_eq!(update.feed_title, "Example Feed");
        assert_eq!(update.site_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_picker_wraps_backwards() {
        let mut dialog = Dialog::open(DialogRequest::CreateFeed { category: None });
        let categories = vec![
            tech_categories().remove(0),
            Category {
                id: 2,
                title: "News".to_string(),
                feeds: Vec::new(),
            },
        ];
        dialog.cycle_category(&categories, -1);
        assert_eq!(dialog.category(), Some(2));
        dialog.cycle_category(&categories, 1);
        assert_eq!(dialog.category(), Some(1));
    }

    #[test]
    fn test_focus_cycles_through_picker() {
        let mut dialog = Dialog::open(DialogRequest::CreateFeed { category: None });
        assert!(!dialog.picker_focused());
        dialog.focus_next();
        assert!(dialog.picker_focused());
        // Typing on the picker edits nothing.
        dialog.insert_char('x');
        assert_eq!(dialog.fields()[0].value, "");
        dialog.focus_next();
        assert_eq!(dialog.focus(), 0);
        dialog.focus_prev();
        assert!(dialog.picker_focused());
    }

    #[test]
    fn test_delete_dialogs_confirm() {
        let dialog = Dialog::open(DialogRequest::DeleteFeed(feed(10, "Example Feed", 1, 0)));
        assert_eq!(
            dialog.confirmation().as_deref(),
            Some("Delete feed \"Example Feed\"?")
        );
        let submission = dialog.submission().unwrap();
        assert_eq!(submission, Submission::DeleteFeed(10));
        assert_eq!(submission.deleted(), Some(Deleted::Feed(10)));

        let dialog = Dialog::open(DialogRequest::DeleteCategory(tech_categories().remove(0)));
        assert_eq!(dialog.submission().unwrap().deleted(), Some(Deleted::Category(1)));
    }

    #[test]
    fn test_edit_user_form() {
        let mut dialog = Dialog::open(DialogRequest::EditUser {
            name: "me".to_string(),
            email: "me@example.com".to_string(),
        });
        assert!(dialog.fields()[2].secret);
        let Submission::UpdateUser(form) = dialog.submission().unwrap() else {
            panic!("expected user update");
        };
        assert_eq!(form.password, "");

        dialog.focus_next();
        dialog.focus_next();
        type_text(&mut dialog, "s3cret");
        let Submission::UpdateUser(form) = dialog.submission().unwrap() else {
            panic!("expected user update");
        };
        assert_eq!(form.password, "s3cret");
        assert_eq!(form.email, "me@example.com");
    }

    #[test]
    fn test_edit_user_requires_name() {
        let dialog = Dialog::open(DialogRequest::EditUser {
            name: "   ".to_string(),
            email: "me@example.com".to_string(),
        });
        assert_eq!(dialog.submission(), Err(DialogError::MissingName));
        assert_eq!(DialogError::MissingName.to_string(), "Name is required");
    }

    #[test]
    fn test_edit_user_rejects_bad_email() {
        let dialog = Dialog::open(DialogRequest::EditUser {
            name: "me".to_string(),
            email: "not-an-email".to_string(),
        });
        assert_eq!(dialog.submission(), Err(DialogError::InvalidEmail));
    }

    #[test]
    fn test_error_clears_on_resubmit() {
        let mut dialog = Dialog::open(DialogRequest::CreateCategory);
        dialog.set_pending();
        dialog.set_error(SAVE_FAILED);
        assert_eq!(dialog.error(), Some(SAVE_FAILED));
        assert!(!dialog.is_pending());
        dialog.set_pending();
        assert_eq!(dialog.error(), None);
    }
}
