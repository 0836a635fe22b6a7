use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnRelations,
            ActionType::ManageOwnProfile,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnRelations,
            ActionType::ManageOwnProfile,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnRelations,
    ManageOwnProfile,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if &session.role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}
