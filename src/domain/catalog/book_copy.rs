use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditInfo, impl_entity};
use crate::domain::errors::{DomainError, DomainResult, Violations, ensure, is_blank};
use crate::domain::value_objects::{BookCopyId, BookId, EntityId};

/// 蔵書の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookCopyStatus {
    Available,
    OnLoan,
    Reserved,
    InMaintenance,
    Lost,
    Damaged,
    /// 除籍（終端状態）
    Withdrawn,
}

/// 蔵書の物理的な状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookCondition {
    New,
    Good,
    Fair,
    Poor,
    Damaged,
}

/// BookCopy集約 - 物理的な1冊
///
/// 状態遷移：
/// - 貸出: Available → OnLoan
/// - 返却: OnLoan → Available
/// - 取置: Available → Reserved
/// - 紛失・破損・修理: 任意の状態から（同じ状態への遷移は失敗）
/// - 除籍: OnLoan以外から。除籍後はすべての遷移が失敗する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCopy {
    id: BookCopyId,
    book_id: BookId,
    barcode: String,
    status: BookCopyStatus,
    condition: BookCondition,
    location: String,
    notes: Option<String>,
    last_inventory_date: DateTime<Utc>,
    audit: AuditInfo,
}

impl_entity!(BookCopy, BookCopyId);

impl BookCopy {
    pub fn create(
        book_id: BookId,
        barcode: &str,
        location: &str,
        status: BookCopyStatus,
        condition: BookCondition,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.require(!book_id.is_nil(), "Book ID cannot be empty.");
        v.require(!is_blank(barcode), "Barcode cannot be empty.");
        v.require(!is_blank(location), "Location cannot be empty.");
        v.require(
            status != BookCopyStatus::Withdrawn,
            "Status cannot be withdrawn on creation.",
        );

        v.finish(|| BookCopy {
            id: BookCopyId::new(),
            book_id,
            barcode: barcode.trim().to_string(),
            status,
            condition,
            location: location.trim().to_string(),
            notes,
            last_inventory_date: now,
            audit: AuditInfo::new(now),
        })
    }

    pub fn id(&self) -> BookCopyId {
        self.id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    pub fn status(&self) -> BookCopyStatus {
        self.status
    }

    pub fn condition(&self) -> BookCondition {
        self.condition
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn last_inventory_date(&self) -> DateTime<Utc> {
        self.last_inventory_date
    }

    /// 貸出可能か（取置中は予約者への貸出のみ）
    pub fn can_be_lent(&self) -> bool {
        matches!(
            self.status,
            BookCopyStatus::Available | BookCopyStatus::Reserved
        )
    }

    pub fn is_available(&self) -> bool {
        self.status == BookCopyStatus::Available
    }

    fn ensure_not_withdrawn(&self) -> DomainResult {
        ensure(
            self.status != BookCopyStatus::Withdrawn,
            "This copy is withdrawn and cannot be updated.",
        )
    }

    pub fn loan_out(&mut self) -> DomainResult {
        ensure(
            self.status != BookCopyStatus::OnLoan,
            "This copy is already loan out.",
        )?;
        ensure(
            self.status == BookCopyStatus::Available,
            "This copy cannot be lent at this time.",
        )?;
        self.status = BookCopyStatus::OnLoan;
        Ok(())
    }

    pub fn return_copy(&mut self) -> DomainResult {
        ensure(
            self.status != BookCopyStatus::Available,
            "This copy is already available.",
        )?;
        ensure(
            self.status == BookCopyStatus::OnLoan,
            "This copy cannot be returned at this time.",
        )?;
        self.status = BookCopyStatus::Available;
        Ok(())
    }

    pub fn reserve(&mut self) -> DomainResult {
        ensure(
            self.status != BookCopyStatus::Reserved,
            "This copy is already reserved.",
        )?;
        ensure(
            self.status == BookCopyStatus::Available,
            "This copy cannot be reserved at this time.",
        )?;
        self.status = BookCopyStatus::Reserved;
        Ok(())
    }

    /// 取置の解除: Reserved → Available
    pub fn release_reservation(&mut self) -> DomainResult {
        ensure(
            self.status == BookCopyStatus::Reserved,
            "This copy is not reserved.",
        )?;
        self.status = BookCopyStatus::Available;
        Ok(())
    }

    pub fn mark_as_lost(&mut self) -> DomainResult {
        self.ensure_not_withdrawn()?;
        ensure(
            self.status != BookCopyStatus::Lost,
            "This copy is already marked as lost.",
        )?;
        self.status = BookCopyStatus::Lost;
        Ok(())
    }

    pub fn mark_as_damaged(&mut self, condition: BookCondition, notes: &str) -> DomainResult {
        self.ensure_not_withdrawn()?;
        ensure(
            self.status != BookCopyStatus::Damaged,
            "This copy is already marked as damaged.",
        )?;
        self.status = BookCopyStatus::Damaged;
        self.condition = condition;
        self.notes = Some(notes.to_string());
        Ok(())
    }

    pub fn send_to_maintenance(&mut self, notes: &str) -> DomainResult {
        self.ensure_not_withdrawn()?;
        ensure(
            self.status != BookCopyStatus::InMaintenance,
            "This copy is already in maintenance.",
        )?;
        self.status = BookCopyStatus::InMaintenance;
        self.notes = Some(notes.to_string());
        Ok(())
    }

    /// 修理完了・発見などで書架に戻す
    pub fn restore_to_shelf(&mut self, condition: BookCondition) -> DomainResult {
        self.ensure_not_withdrawn()?;
        ensure(
            matches!(
                self.status,
                BookCopyStatus::InMaintenance | BookCopyStatus::Damaged | BookCopyStatus::Lost
            ),
            "Only copies in maintenance, damaged or lost can be returned to the shelf.",
        )?;
        self.status = BookCopyStatus::Available;
        self.condition = condition;
        Ok(())
    }

    /// 除籍。貸出中は不可
    pub fn withdraw(&mut self, reason: &str) -> DomainResult {
        self.ensure_not_withdrawn()?;
        ensure(
            self.status != BookCopyStatus::OnLoan,
            "A copy on loan cannot be withdrawn.",
        )?;
        ensure(!is_blank(reason), "Withdrawal reason cannot be empty.")?;
        self.status = BookCopyStatus::Withdrawn;
        self.notes = Some(match self.notes.take() {
            Some(existing) => format!("{existing}\nWithdrawn: {reason}"),
            None => format!("Withdrawn: {reason}"),
        });
        Ok(())
    }

    pub fn update_inventory_date(&mut self, now: DateTime<Utc>) -> DomainResult {
        self.ensure_not_withdrawn()?;
        self.last_inventory_date = now;
        Ok(())
    }

    pub fn relocate(&mut self, location: &str) -> DomainResult {
        self.ensure_not_withdrawn()?;
        if is_blank(location) {
            return Err(DomainError::new("Location cannot be empty."));
        }
        self.location = location.trim().to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy_with(status: BookCopyStatus) -> BookCopy {
        BookCopy::create(
            BookId::new(),
            "BC-0001",
            "Shelf A",
            status,
            BookCondition::Good,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_cannot_create_withdrawn() {
        let result = BookCopy::create(
            BookId::new(),
            "BC-0001",
            "Shelf A",
            BookCopyStatus::Withdrawn,
            BookCondition::New,
            None,
            Utc::now(),
        );
        assert_eq!(
            result.unwrap_err().errors(),
            ["Status cannot be withdrawn on creation."]
        );
    }

    #[test]
    fn test_create_requires_barcode_and_location() {
        let err = BookCopy::create(
            BookId::new(),
            " ",
            "",
            BookCopyStatus::Available,
            BookCondition::New,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn test_loan_out_twice_fails() {
        let mut copy = copy_with(BookCopyStatus::Available);
        copy.loan_out().unwrap();
        assert_eq!(copy.status(), BookCopyStatus::OnLoan);

        let err = copy.loan_out().unwrap_err();
        assert_eq!(err.errors(), ["This copy is already loan out."]);
    }

    #[test]
    fn test_loan_out_only_from_available() {
        for status in [
            BookCopyStatus::Reserved,
            BookCopyStatus::InMaintenance,
            BookCopyStatus::Lost,
            BookCopyStatus::Damaged,
        ] {
            let mut copy = copy_with(status);
            let err = copy.loan_out().unwrap_err();
            assert_eq!(err.errors(), ["This copy cannot be lent at this time."]);
            assert_eq!(copy.status(), status);
        }
    }

    #[test]
    fn test_return_only_from_on_loan() {
        let mut copy = copy_with(BookCopyStatus::Available);
        assert!(copy.return_copy().is_err());
        copy.loan_out().unwrap();
        copy.return_copy().unwrap();
        assert!(copy.is_available());

        let mut lost = copy_with(BookCopyStatus::Lost);
        assert!(lost.return_copy().is_err());
    }

    #[test]
    fn test_reserve_and_release() {
        let mut copy = copy_with(BookCopyStatus::Available);
        copy.reserve().unwrap();
        assert!(copy.can_be_lent());
        assert!(!copy.is_available());
        assert!(copy.reserve().is_err());
        copy.release_reservation().unwrap();
        assert!(copy.is_available());
        assert!(copy.release_reservation().is_err());
    }

    #[test]
    fn test_mark_lost_is_guarded() {
        let mut copy = copy_with(BookCopyStatus::OnLoan);
        copy.mark_as_lost().unwrap();
        assert!(copy.mark_as_lost().is_err());
    }

    #[test]
    fn test_mark_damaged_records_condition() {
        let mut copy = copy_with(BookCopyStatus::Available);
        copy.mark_as_damaged(BookCondition::Poor, "water damage").unwrap();
        assert_eq!(copy.status(), BookCopyStatus::Damaged);
        assert_eq!(copy.condition(), BookCondition::Poor);
        assert_eq!(copy.notes(), Some("water damage"));
        assert!(copy.mark_as_damaged(BookCondition::Poor, "again").is_err());
    }

    #[test]
    fn test_maintenance_then_shelf() {
        let mut copy = copy_with(BookCopyStatus::Damaged);
        copy.send_to_maintenance("rebinding").unwrap();
        assert!(copy.send_to_maintenance("twice").is_err());
        copy.restore_to_shelf(BookCondition::Good).unwrap();
        assert!(copy.is_available());
        assert!(copy.restore_to_shelf(BookCondition::Good).is_err());
    }

    #[test]
    fn test_withdrawn_is_terminal() {
        let mut copy = copy_with(BookCopyStatus::Damaged);
        copy.withdraw("beyond repair").unwrap();
        assert_eq!(copy.status(), BookCopyStatus::Withdrawn);

        assert!(copy.loan_out().is_err());
        assert!(copy.reserve().is_err());
        assert!(copy.mark_as_lost().is_err());
        assert!(copy.send_to_maintenance("x").is_err());
        assert!(copy.update_inventory_date(Utc::now()).is_err());
        assert!(copy.relocate("Basement").is_err());
        assert!(copy.withdraw("again").is_err());
    }

    #[test]
    fn test_cannot_withdraw_on_loan() {
        let mut copy = copy_with(BookCopyStatus::OnLoan);
        assert!(copy.withdraw("old").is_err());
        assert_eq!(copy.status(), BookCopyStatus::OnLoan);
    }

    #[test]
    fn test_relocate() {
        let mut copy = copy_with(BookCopyStatus::Available);
        assert!(copy.relocate(" ").is_err());
        copy.relocate("Shelf B").unwrap();
        assert_eq!(copy.location(), "Shelf B");
    }
}
