//! Search session state and its selection transitions.
//!
//! `highlighted_item` is the keyboard cursor and always refers to an element
//! of `results`. `selected_item` is the confirmed choice. `current_item` is
//! the geolocated fallback and has its own lifecycle.

use skycast_weather::LocationCandidate;

/// Where the startup geolocation lookup ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeolocationStatus {
    /// Not attempted yet
    #[default]
    Unknown,
    /// The system has no geolocation capability; lookup skipped
    Unsupported,
    /// `current_item` holds the nearest location
    Resolved,
    /// Denied, failed, or no nearby location
    Unresolved,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    query: String,
    results: Vec<LocationCandidate>,
    highlighted_item: Option<LocationCandidate>,
    selected_item: Option<LocationCandidate>,
    current_item: Option<LocationCandidate>,
    geolocation: GeolocationStatus,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[LocationCandidate] {
        &self.results
    }

    pub fn highlighted_item(&self) -> Option<&LocationCandidate> {
        self.highlighted_item.as_ref()
    }

    pub fn selected_item(&self) -> Option<&LocationCandidate> {
        self.selected_item.as_ref()
    }

    pub fn current_item(&self) -> Option<&LocationCandidate> {
        self.current_item.as_ref()
    }

    pub fn geolocation(&self) -> GeolocationStatus {
        self.geolocation
    }

    /// Editing the text abandons any confirmed selection.
    pub fn set_query(&mut self, text: impl Into<String>) {
        self.selected_item = None;
        self.query = text.into();
    }

    pub fn select_item(&mut self, item: Option<LocationCandidate>) {
        self.selected_item = item;
    }

    /// Move the cursor to `item`. Candidates not in `results` are ignored.
    ///
    /// Returns whether the highlight changed.
    pub fn highlight_item(&mut self, item: &LocationCandidate) -> bool {
        match self.results.iter().find(|r| r.id == item.id) {
            Some(found) if self.highlighted_item.as_ref() != Some(found) => {
                self.highlighted_item = Some(found.clone());
                true
            }
            _ => false,
        }
    }

    /// Replace the result list and put the cursor on its first entry.
    pub fn show_results(&mut self, results: Vec<LocationCandidate>) {
        self.highlighted_item = results.first().cloned();
        self.results = results;
    }

    /// Position of the highlighted item within `results`, matched by id
    pub fn highlighted_index(&self) -> Option<usize> {
        let highlighted = self.highlighted_item.as_ref()?;
        self.results.iter().position(|r| r.id == highlighted.id)
    }

    /// Move the cursor up one entry. No-op at the top or with no cursor.
    pub fn prev_item(&mut self) -> bool {
        match self.highlighted_index() {
            Some(index) if index > 0 => {
                self.highlighted_item = Some(self.results[index - 1].clone());
                true
            }
            _ => false,
        }
    }

    /// Move the cursor down one entry, or onto the first entry when there is
    /// no cursor. No-op at the bottom.
    pub fn next_item(&mut self) -> bool {
        let target = match self.highlighted_index() {
            None => 0,
            Some(index) if index + 1 < self.results.len() => index + 1,
            Some(_) => return false,
        };
        match self.results.get(target) {
            Some(item) => {
                self.highlighted_item = Some(item.clone());
                true
            }
            None => false,
        }
    }

    pub fn set_current_item(&mut self, item: Option<LocationCandidate>, status: GeolocationStatus) {
        self.current_item = item;
        self.geolocation = status;
    }

    /// The location driving the forecast: the confirmed choice, else the
    /// geolocated one.
    pub fn active_location(&self) -> Option<&LocationCandidate> {
        self.selected_item.as_ref().or(self.current_item.as_ref())
    }

    /// The result list is shown while there are results and nothing is selected.
    pub fn show_results_list(&self) -> bool {
        !self.results.is_empty() && self.selected_item.is_none()
    }

    /// Text for the search box: the selected title, else the raw query.
    pub fn query_value(&self) -> &str {
        self.selected_item
            .as_ref()
            .map(|item| item.title.as_str())
            .unwrap_or(self.query.as_str())
    }

    pub fn is_highlighted(&self, item: &LocationCandidate) -> bool {
        self.highlighted_item
            .as_ref()
            .is_some_and(|highlighted| highlighted.id == item.id)
    }
}
