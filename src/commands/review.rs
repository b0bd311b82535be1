//! "Save EMR" action.

use crate::review::{EditableForm, FormRenderer, FormState, SaveAck};

/// Accept the clinician's edited form. The edited record becomes the current
/// one; nothing is written anywhere.
pub fn save_record(
    renderer: &dyn FormRenderer,
    state: &mut FormState,
    form: EditableForm,
) -> Result<SaveAck, String> {
    let record = form.into_record();
    if record.is_empty() {
        return Err("Nothing to save. Generate an EMR first.".into());
    }

    let record = state.apply::<String>(Ok(record))?.clone();
    Ok(renderer.on_save(record))
}
