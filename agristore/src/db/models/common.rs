//! Classifications shared by several record types

string_enum! {
    /// Trustworthiness of a recorded measurement
    pub enum DataQuality {
        Excellent => "EXCELLENT",
        Good => "GOOD",
        Fair => "FAIR",
        Poor => "POOR",
    }
}

string_enum! {
    pub enum ValidationStatus {
        Validated => "VALIDATED",
        Pending => "PENDING",
        Rejected => "REJECTED",
    }
}

string_enum! {
    /// Season a report or forecast refers to
    pub enum ReportingSeason {
        SeasonA => "SEASON_A",
        SeasonB => "SEASON_B",
        SeasonC => "SEASON_C",
        Annual => "ANNUAL",
    }
}
