/// Instruction sent alongside the person and outfit images.
pub const TRY_ON: &str = include_str!("../data/prompts/try_on.txt");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_non_empty() {
        assert!(!TRY_ON.trim().is_empty());
    }

    #[test]
    fn test_prompt_orders_person_before_outfit() {
        let person = TRY_ON.find("first contains a person").unwrap();
        let outfit = TRY_ON.find("second contains an outfit").unwrap();
        assert!(person < outfit);
    }

    #[test]
    fn test_prompt_keeps_face_and_background_constraints() {
        assert!(TRY_ON.contains("Face Integrity"));
        assert!(TRY_ON.contains("Background Preservation"));
    }
}
