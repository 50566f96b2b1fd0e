use chrono::NaiveDateTime;

/// Genre type telling the host to display `genre_description` verbatim
/// instead of looking the numeric pair up in its table.
pub const GENRE_USE_STRING: i32 = 256;

/// A classified genre triple in the host's numeric scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Genre {
    pub genre_type: i32,
    pub genre_sub_type: i32,
    pub description: String,
}

impl Genre {
    /// A genre resolved through a broadcaster's static table.
    pub fn from_table(genre_type: i32, genre_sub_type: i32) -> Self {
        Self {
            genre_type,
            genre_sub_type,
            description: String::new(),
        }
    }

    /// A free-text genre the table does not know.
    pub fn other(description: String) -> Self {
        Self {
            genre_type: GENRE_USE_STRING,
            genre_sub_type: 0,
            description,
        }
    }
}

/// One guide entry, mapped 1:1 onto the host's EPG ABI struct.
///
/// Times are viewer-local naive datetimes; the host bridge turns them into
/// epoch seconds with the local mktime(). Entries are built per aggregation
/// call and not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct EpgEntry {
    /// Unique within one channel's guide; deterministic across calls.
    pub broadcast_id: u32,
    pub title: String,
    /// Back-reference to `Channel::unique_id`.
    pub channel_uid: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub plot: String,
    pub plot_outline: String,
    pub original_title: String,
    pub cast: String,
    pub episode_name: String,
    /// 0 means unknown.
    pub year: i32,
    /// -1 means unknown; the host treats 0 as a real series number.
    pub series_number: i32,
    /// -1 means unknown.
    pub episode_number: i32,
    pub genre_type: i32,
    pub genre_sub_type: i32,
    pub genre_description: String,
}

impl EpgEntry {
    /// A new entry with the required fields set and every optional field at
    /// its host-ABI default.
    pub fn new(
        broadcast_id: u32,
        channel_uid: u32,
        title: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            broadcast_id,
            title,
            channel_uid,
            start,
            end,
            plot: String::new(),
            plot_outline: String::new(),
            original_title: String::new(),
            cast: String::new(),
            episode_name: String::new(),
            year: 0,
            series_number: -1,
            episode_number: -1,
            genre_type: 0,
            genre_sub_type: 0,
            genre_description: String::new(),
        }
    }

    /// Apply a classified genre triple.
    pub fn set_genre(&mut self, genre: Genre) {
        self.genre_type = genre.genre_type;
        self.genre_sub_type = genre.genre_sub_type;
        self.genre_description = genre.description;
    }
}

/// The caller's query window in viewer-local time, half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpgWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl EpgWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether an entry spanning `[entry_start, entry_end]` overlaps the
    /// window.
    pub fn overlaps(&self, entry_start: NaiveDateTime, entry_end: NaiveDateTime) -> bool {
        entry_end >= self.start && entry_start < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}
