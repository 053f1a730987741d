pub mod community;
pub mod narration;
pub mod normalizer;
pub mod present;
pub mod search;
pub mod session;
pub mod source;
pub mod timeline;

pub use community::{image_data_url, parse_tags, CommunityClient, CommunityPublisher, PostDraft};
pub use narration::{
    CommandNarrator, LogNarrator, Narrator, RecordingNarrator, SilentNarrator,
    RECIPE_COMPLETE_PHRASE, STEP_COMPLETE_PHRASE,
};
pub use normalizer::{normalize, normalize_value, parse_time_range};
pub use search::{save_recipe, search_recipe, SearchError};
pub use session::{TimelineEvent, TimelineSession};
pub use source::{MissingRecipeSource, RecipeSource, RecipeSourceClient};
pub use timeline::{StepStatus, StepView, TimelineController, TimelineState, TimerPhase};
