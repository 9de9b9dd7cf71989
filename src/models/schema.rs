//! Slot and intention tables for the gold annotation schema.

/// Slot whose value is a list of areas, edited as a comma-separated string.
pub const HAIR_REMOVAL_AREAS: &str = "hair_removal_areas";

/// Slot used by the "treatment present" listing filter.
pub const TREATMENT: &str = "treatment";

/// Free-form string (or list-of-string) slots, in display order.
pub const STRING_SLOTS: &[&str] = &[
    "treatment",
    HAIR_REMOVAL_AREAS,
    "hair_removal_type",
    "hair_type_on_face",
    "tattoo_removal_category",
    "tattoo_equipment",
    "blood_vessels_area",
    "specialist",
    "specialist_name",
    "city",
    "address",
    "number_phone",
    "name",
    "date_time",
];

/// Tri-state boolean slots (true / false / null).
pub const BOOL_SLOTS: &[&str] = &[
    "has_contraindications",
    "is_first_time",
    "can_visit_center",
    "is_consultation",
];

/// Intention tags an annotator can attach to a record.
pub const INTENTION_TYPES: &[&str] = &[
    "greet",
    "ask_question",
    "ask_work_schedule",
    "book_appointment",
    "reschedule_appointment",
    "cancel_appointment",
    "existing_appointment",
    "ask_about_the_price",
    "appointment_availability",
    "end_conversation",
];

/// All known slots: string slots first, then boolean slots.
pub fn all_slots() -> impl Iterator<Item = &'static str> {
    STRING_SLOTS.iter().chain(BOOL_SLOTS.iter()).copied()
}

/// Whether `slot` is one of the boolean slots.
pub fn is_bool_slot(slot: &str) -> bool {
    BOOL_SLOTS.contains(&slot)
}
