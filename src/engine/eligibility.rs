use crate::error::{Error, Result};
use crate::model::{
    common::{election::ElectionType, member::Role},
    db::member::Member,
    mongodb::Id,
};
use crate::store::{MemberFilter, Transaction};

/// Who must vote on a new round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Electorate {
    /// Holders of a standing `Member` ballot, in membership order.
    pub members: Vec<Id>,
    /// The current chairperson, who also receives the chair-only ballots on access reviews.
    pub chair: Option<Id>,
}

impl Electorate {
    fn from_members(voters: &[Member], chair: Option<&Member>) -> Self {
        let mut members: Vec<Id> = Vec::with_capacity(voters.len());
        for voter in voters {
            if !members.contains(&voter.id) {
                members.push(voter.id);
            }
        }
        Self {
            members,
            chair: chair.map(|c| c.id),
        }
    }
}

/// The current chairperson, if there is one.
pub(super) async fn current_chair(txn: &mut dyn Transaction) -> Result<Option<Member>> {
    let mut chairs = txn
        .find_members(&MemberFilter::with_roles(&[Role::Chairperson]))
        .await?;
    if chairs.len() > 1 {
        warn!("{} active chairpersons, using the first", chairs.len());
    }
    Ok(if chairs.is_empty() {
        None
    } else {
        Some(chairs.swap_remove(0))
    })
}

/// Resolve the voters for a new round of `election_type`.
///
/// Committee reviews go to every active chairperson and member. Dataset reviews go
/// to the dataset's data owners instead. A missing chair is not an error.
pub(super) async fn resolve_voters(
    txn: &mut dyn Transaction,
    election_type: ElectionType,
    dataset_id: Option<&str>,
) -> Result<Electorate> {
    let chair = current_chair(txn).await?;
    let voters = match election_type {
        ElectionType::DatasetReview => {
            let dataset_id = dataset_id
                .ok_or_else(|| Error::invalid("Dataset reviews need a dataset"))?;
            txn.find_members(&MemberFilter::data_owners(dataset_id))
                .await?
        }
        _ => {
            txn.find_members(&MemberFilter::with_roles(&Role::VOTING))
                .await?
        }
    };
    let electorate = Electorate::from_members(&voters, chair.as_ref());
    debug!(
        "Resolved {} voter(s) for {election_type:?}, chair: {:?}",
        electorate.members.len(),
        electorate.chair
    );
    Ok(electorate)
}
