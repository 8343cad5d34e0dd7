//! Question-paper workflow: the status graph, the transition table, and the
//! role capability table. Everything here is pure so the rules can be tested
//! without a database or IPC harness; handlers never compare status strings
//! on their own.

/// Lifecycle states of a question paper.
///
/// `ApprovedLocked` is terminal. `SubmittedToCoeAfterScrutiny` still accepts
/// exam-office decisions but its content is already frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Assigned,
    Draft,
    SubmittedToCoe,
    UnderScrutiny,
    CorrectionsRequested,
    SubmittedToCoeAfterScrutiny,
    ApprovedLocked,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Assigned => "Assigned",
            Status::Draft => "Draft",
            Status::SubmittedToCoe => "SubmittedToCOE",
            Status::UnderScrutiny => "UnderScrutiny",
            Status::CorrectionsRequested => "CorrectionsRequested",
            Status::SubmittedToCoeAfterScrutiny => "SubmittedToCOEAfterScrutiny",
            Status::ApprovedLocked => "ApprovedLocked",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "Assigned" => Some(Status::Assigned),
            "Draft" => Some(Status::Draft),
            "SubmittedToCOE" => Some(Status::SubmittedToCoe),
            "UnderScrutiny" => Some(Status::UnderScrutiny),
            "CorrectionsRequested" => Some(Status::CorrectionsRequested),
            "SubmittedToCOEAfterScrutiny" => Some(Status::SubmittedToCoeAfterScrutiny),
            "ApprovedLocked" => Some(Status::ApprovedLocked),
            _ => None,
        }
    }

    /// Content is frozen from the scrutiny hand-back onwards.
    pub fn is_locked(self) -> bool {
        matches!(
            self,
            Status::SubmittedToCoeAfterScrutiny | Status::ApprovedLocked
        )
    }
}

/// Workflow events. `Assign` has no source state; `Delete` is the
/// exam-office escape hatch for erroneous assignments, not part of the
/// normal flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Assign,
    SetterEdit,
    SubmitToCoe,
    SendToScrutiny,
    ScrutinyEdit,
    ScrutinySubmit,
    Approve,
    SendBack,
    Delete,
}

const SETTER_STATES: &[Status] = &[
    Status::Assigned,
    Status::Draft,
    Status::CorrectionsRequested,
];

// Approve accepts the normal post-scrutiny hand-back and also lets the
// exam office short-circuit scrutiny; SendBack only makes sense before the
// scrutiny sign-off.
const APPROVABLE_STATES: &[Status] = &[
    Status::UnderScrutiny,
    Status::SubmittedToCoe,
    Status::SubmittedToCoeAfterScrutiny,
];

const RETURNABLE_STATES: &[Status] = &[Status::UnderScrutiny, Status::SubmittedToCoe];

const DELETABLE_STATES: &[Status] = &[
    Status::Assigned,
    Status::Draft,
    Status::SubmittedToCoe,
    Status::UnderScrutiny,
    Status::CorrectionsRequested,
    Status::SubmittedToCoeAfterScrutiny,
];

/// States an event may fire from. Empty for `Assign` (no source paper).
pub fn allowed_from(event: Event) -> &'static [Status] {
    match event {
        Event::Assign => &[],
        Event::SetterEdit | Event::SubmitToCoe => SETTER_STATES,
        Event::SendToScrutiny => &[Status::SubmittedToCoe],
        Event::ScrutinyEdit | Event::ScrutinySubmit => &[Status::UnderScrutiny],
        Event::Approve => APPROVABLE_STATES,
        Event::SendBack => RETURNABLE_STATES,
        Event::Delete => DELETABLE_STATES,
    }
}

/// The transition table. Returns the status after `event` fires from
/// `from`, or `None` when the transition is not legal from that state —
/// callers surface that as a state conflict, never as a silent no-op.
pub fn next_status(event: Event, from: Status) -> Option<Status> {
    if !allowed_from(event).contains(&from) {
        return None;
    }
    Some(match event {
        Event::Assign => unreachable!("Assign has no source state"),
        // A first edit moves the paper out of Assigned; later edits and
        // edits during a correction round keep the current status.
        Event::SetterEdit => {
            if from == Status::Assigned {
                Status::Draft
            } else {
                from
            }
        }
        Event::SubmitToCoe => Status::SubmittedToCoe,
        Event::SendToScrutiny => Status::UnderScrutiny,
        Event::ScrutinyEdit => from,
        Event::ScrutinySubmit => Status::SubmittedToCoeAfterScrutiny,
        Event::Approve => Status::ApprovedLocked,
        Event::SendBack => Status::CorrectionsRequested,
        Event::Delete => from,
    })
}

/// Audit-log label for each event. Labels are part of the stored history
/// format and must stay stable.
pub fn history_action(event: Event) -> &'static str {
    match event {
        Event::Assign => "Assigned",
        Event::SetterEdit => "EditedBySetter",
        Event::SubmitToCoe => "SubmittedToCOE",
        Event::SendToScrutiny => "SentToScrutiny",
        Event::ScrutinyEdit => "EditedByScrutiny",
        Event::ScrutinySubmit => "SubmittedByScrutiny",
        Event::Approve => "ApprovedLocked",
        Event::SendBack => "CorrectionsRequested",
        Event::Delete => "Deleted",
    }
}

/// Events that must carry a non-empty note (the hand-back explanation and
/// the scrutiny sign-off).
pub fn requires_note(event: Event) -> bool {
    matches!(event, Event::ScrutinySubmit | Event::SendBack)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Coe,
    AssistantCoe,
    ChairmanOfExams,
    Hod,
    Staff,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "Admin" => Some(Role::Admin),
            "COE" => Some(Role::Coe),
            "AssistantCOE" => Some(Role::AssistantCoe),
            "ChairmanOfExams" => Some(Role::ChairmanOfExams),
            "HOD" => Some(Role::Hod),
            "Staff" => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Coe => "COE",
            Role::AssistantCoe => "AssistantCOE",
            Role::ChairmanOfExams => "ChairmanOfExams",
            Role::Hod => "HOD",
            Role::Staff => "Staff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create a paper and attach a setter.
    AssignPaper,
    /// Route a submitted paper to a scrutiny staff member.
    RouteScrutiny,
    /// Approve or send back a paper.
    DecidePaper,
    /// See every paper regardless of ownership.
    ViewAllPapers,
    /// Remove an erroneous assignment outright.
    DeletePaper,
    /// Hold paper content as setter or scrutiny (ownership is checked
    /// separately; a role alone never grants access to someone else's
    /// paper).
    AuthorPaper,
    /// Maintain the staff and subject directories.
    ManageDirectory,
}

/// Single capability table for the whole daemon. Roles with exam-office
/// authority are COE, AssistantCOE and ChairmanOfExams; deletion stays
/// with the COE alone.
pub fn role_can(role: Role, cap: Capability) -> bool {
    match cap {
        Capability::AssignPaper | Capability::RouteScrutiny | Capability::DecidePaper => {
            matches!(role, Role::Coe | Role::AssistantCoe | Role::ChairmanOfExams)
        }
        Capability::ViewAllPapers => {
            matches!(role, Role::Coe | Role::AssistantCoe | Role::ChairmanOfExams)
        }
        Capability::DeletePaper => matches!(role, Role::Coe),
        Capability::AuthorPaper => matches!(
            role,
            Role::Staff | Role::Hod | Role::Coe | Role::AssistantCoe
        ),
        Capability::ManageDirectory => matches!(role, Role::Admin | Role::Coe),
    }
}
